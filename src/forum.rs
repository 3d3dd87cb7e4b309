//! 📦 포럼 도메인 모델과 저장소 서비스
//!
//! [`Forum`] owns the whole in-memory [`ForumData`] behind one async lock. Every
//! mutation is a read-modify-write of the full document: the new document is
//! built as a copy, persisted, and swapped in only once the write succeeded.
//! 저장 도중 future 가 drop 되어도 (예: 요청 타임아웃) 메모리 상태는 그대로입니다.

use std::time::{SystemTime, UNIX_EPOCH}; // 게시 시각 (Unix 초)

use serde::{Deserialize, Serialize}; // JSON ↔ struct 변환
use tokio::sync::Mutex; // await 를 넘어 잡고 있을 수 있는 비동기 락
use validator::Validate; // 입력 길이 검증 derive

use crate::{
    error::AppError,                              // HTTP 응답으로 변환되는 에러
    persistence::{Persistence, PersistenceError}, // 스냅샷 저장소
};

/// 빈 저장소의 첫 게시글 ID. 이후 게시글마다 2 씩 증가.
const FIRST_POST_ID: u64 = 2041;

// ✨ 게시글 (저장되는 전체 형태)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: u64,    // 2 * (기존 게시글 수) + 2041
    pub sender: String,  // 작성자, 1~20 글자
    pub title: String,   // 제목, 1~20 글자
    pub content: String, // 본문, 1~250 글자
    pub time_sent: u64,  // 작성 시각 (Unix 초)
}

// ✨ 댓글: 저장 형식의 `comments` 배열 원소. 댓글을 만드는 라우트는 없음.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: u64, // 댓글 ID
    pub post_id: u64,    // 대상 게시글 ID
    pub sender: String,  // 작성자
    pub comment: String, // 댓글 내용
    pub time_sent: u64,  // 작성 시각 (Unix 초)
}

// ✨ 저장되는 문서 전체: `{"posts": [...], "comments": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumData {
    #[serde(default)]
    pub posts: Vec<Post>, // 삽입 순서 그대로
    #[serde(default)]
    pub comments: Vec<Comment>, // 항상 비어 있음
}

// ✨ `POST /post/create` 요청 본문
// 빠진 필드는 빈 문자열로 처리되어 검증 단계에서 걸러집니다.
// 길이는 UTF-16 코드 유닛이 아니라 유니코드 스칼라 값(char) 개수로 셉니다.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewPost {
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub sender: String, // 1~20 char (이모지 1개 = 1 글자)

    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub title: String, // 1~20 char

    #[serde(default)]
    #[validate(length(min = 1, max = 250, message = "must be between 1 and 250 characters"))]
    pub content: String, // 1~250 char
}

// ✨ 목록 응답 원소: `content` 는 일부러 뺌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub post_id: u64,   // 게시글 ID
    pub sender: String, // 작성자
    pub title: String,  // 제목
    pub time_sent: u64, // 작성 시각
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.post_id,
            sender: post.sender.clone(),
            title: post.title.clone(),
            time_sent: post.time_sent,
        }
    }
}

/// 🧠 포럼 서비스: 메모리 상태 + 저장소
pub struct Forum<P> {
    data: Mutex<ForumData>, // 단일 writer 락
    persistence: P,         // 파일 / 원격 / 메모리 저장소
}

impl<P: Persistence> Forum<P> {
    /// Builds the forum from whatever `persistence` currently holds.
    pub async fn load(persistence: P) -> Result<Self, PersistenceError> {
        let data = persistence.load().await?;
        tracing::info!(
            posts = data.posts.len(),
            comments = data.comments.len(),
            "forum data loaded"
        );
        Ok(Self::with_data(persistence, data))
    }

    pub fn with_data(persistence: P, data: ForumData) -> Self {
        Self {
            data: Mutex::new(data),
            persistence,
        }
    }

    /// Validates `input`, appends a new post and persists the store.
    ///
    /// Returns the new post's ID, `2 * count + 2041`.
    pub async fn create_post(&self, input: NewPost) -> Result<u64, AppError> {
        // 검증이 락/변경보다 먼저
        input.validate()?;

        let mut data = self.data.lock().await;
        let post_id = next_post_id(data.posts.len());

        // 사본을 만들어 저장하고, 저장이 끝난 뒤에만 교체
        let mut updated = data.clone();
        updated.posts.push(Post {
            post_id,
            sender: input.sender,
            title: input.title,
            content: input.content,
            time_sent: unix_timestamp(),
        });

        self.persistence.save(&updated).await?;
        *data = updated;

        tracing::debug!(post_id, "post created");
        Ok(post_id)
    }

    /// All posts, newest (highest ID) first.
    pub async fn list_posts(&self) -> Vec<PostSummary> {
        let data = self.data.lock().await;
        let mut posts: Vec<PostSummary> = data.posts.iter().map(PostSummary::from).collect();
        posts.sort_by(|a, b| b.post_id.cmp(&a.post_id));
        posts
    }

    /// Drops every post and comment and persists the empty store.
    pub async fn clear(&self) -> Result<(), AppError> {
        let mut data = self.data.lock().await;

        // 빈 문서를 먼저 저장하고, 성공해야 메모리도 비움
        self.persistence.save(&ForumData::default()).await?;
        let previous = std::mem::take(&mut *data);

        tracing::debug!(
            posts = previous.posts.len(),
            comments = previous.comments.len(),
            "forum cleared"
        );
        Ok(())
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> ForumData {
        self.data.lock().await.clone()
    }
}

fn next_post_id(post_count: usize) -> u64 {
    2 * post_count as u64 + FIRST_POST_ID
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::time::timeout;

    fn new_post(sender: &str, title: &str, content: &str) -> NewPost {
        NewPost {
            sender: sender.to_owned(),
            title: title.to_owned(),
            content: content.to_owned(),
        }
    }

    fn forum() -> Forum<MemoryStore> {
        Forum::with_data(MemoryStore, ForumData::default())
    }

    /// 저장에 실패하도록 설정할 수 있는 테스트용 저장소
    #[derive(Default)]
    struct FlakyStore {
        failing: AtomicBool,
    }

    impl Persistence for FlakyStore {
        async fn load(&self) -> Result<ForumData, PersistenceError> {
            Ok(ForumData::default())
        }

        async fn save(&self, _data: &ForumData) -> Result<(), PersistenceError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(std::io::Error::other("disk full").into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn ids_start_at_2041_and_step_by_two() {
        let forum = forum();

        for expected in [2041, 2043, 2045] {
            let id = forum
                .create_post(new_post("Emily", "COMP1531 Post", "Welcome to COMP1531!"))
                .await
                .unwrap();
            assert_eq!(id, expected);
        }
    }

    #[tokio::test]
    async fn accepts_boundary_lengths() {
        let forum = forum();

        forum
            .create_post(new_post("s", "t", "c"))
            .await
            .unwrap();
        forum
            .create_post(new_post(&"s".repeat(20), &"t".repeat(20), &"c".repeat(250)))
            .await
            .unwrap();

        assert_eq!(forum.snapshot().await.posts.len(), 2);
    }

    #[tokio::test]
    async fn length_is_counted_in_characters() {
        let forum = forum();

        // 20 글자, 60 바이트
        let sender = "가".repeat(20);
        forum
            .create_post(new_post(&sender, "title", "content"))
            .await
            .unwrap();

        // 이모지 1개 = char 1개 (UTF-16 으로는 2 유닛)
        forum
            .create_post(new_post(&"😀".repeat(20), "title", "content"))
            .await
            .unwrap();
        let err = forum
            .create_post(new_post(&"😀".repeat(21), "title", "content"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_out_of_range_fields_without_mutating() {
        let forum = forum();
        let cases = [
            new_post("", "valid", "valid"),
            new_post("valid", "", "valid"),
            new_post("valid", "valid", ""),
            new_post(&"s".repeat(21), "valid", "valid"),
            new_post("valid", &"t".repeat(21), "valid"),
            new_post("valid", "valid", &"c".repeat(251)),
        ];

        for input in cases {
            let err = forum.create_post(input).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert!(forum.snapshot().await.posts.is_empty());
    }

    #[tokio::test]
    async fn validation_message_names_field_and_bounds() {
        let err = forum()
            .create_post(new_post("valid", "valid", ""))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("content"), "{message}");
        assert!(message.contains("between 1 and 250"), "{message}");
    }

    #[tokio::test]
    async fn list_is_newest_first_without_content() {
        let forum = forum();
        for i in 0..10 {
            forum
                .create_post(new_post(
                    &format!("sender {i}"),
                    &format!("title {i}"),
                    &format!("content {i}"),
                ))
                .await
                .unwrap();
        }

        let posts = forum.list_posts().await;
        assert_eq!(posts.len(), 10);
        assert!(posts.windows(2).all(|w| w[0].post_id > w[1].post_id));
        assert_eq!(posts[0].sender, "sender 9");
        assert_eq!(posts[9].title, "title 0");

        let json = serde_json::to_value(&posts[0]).unwrap();
        assert!(json.get("content").is_none());
        assert!(json.get("postId").is_some());
        assert!(json.get("timeSent").is_some());
    }

    #[tokio::test]
    async fn list_of_empty_forum_is_empty() {
        assert!(forum().list_posts().await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let forum = forum();
        forum
            .create_post(new_post("Nick", "COMP1531", "Welcome to COMP1531!"))
            .await
            .unwrap();

        forum.clear().await.unwrap();
        forum.clear().await.unwrap();

        assert_eq!(forum.snapshot().await, ForumData::default());
        // 초기화 후 ID 는 다시 2041 부터
        let id = forum.create_post(new_post("a", "b", "c")).await.unwrap();
        assert_eq!(id, 2041);
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_state() {
        let forum = Forum::with_data(FlakyStore::default(), ForumData::default());
        forum.create_post(new_post("a", "b", "c")).await.unwrap();

        forum.persistence.failing.store(true, Ordering::SeqCst);

        let err = forum.create_post(new_post("d", "e", "f")).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(forum.snapshot().await.posts.len(), 1);

        let err = forum.clear().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(forum.snapshot().await.posts.len(), 1);
    }

    /// 저장이 오래 걸리는 테스트용 저장소 (끝나면 실패)
    struct SlowStore;

    impl Persistence for SlowStore {
        async fn load(&self) -> Result<ForumData, PersistenceError> {
            Ok(ForumData::default())
        }

        async fn save(&self, _data: &ForumData) -> Result<(), PersistenceError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Err(std::io::Error::other("too slow").into())
        }
    }

    #[tokio::test]
    async fn cancelled_save_keeps_previous_state() {
        let seeded = ForumData {
            posts: vec![Post {
                post_id: 2041,
                sender: "a".to_owned(),
                title: "b".to_owned(),
                content: "c".to_owned(),
                time_sent: 1_700_000_000,
            }],
            comments: Vec::new(),
        };
        let forum = Forum::with_data(SlowStore, seeded.clone());

        // 저장 도중 future 가 drop 되는 상황 (요청 타임아웃과 같음)
        let created = timeout(
            Duration::from_millis(50),
            forum.create_post(new_post("d", "e", "f")),
        )
        .await;
        assert!(created.is_err());
        assert_eq!(forum.snapshot().await, seeded);

        let cleared = timeout(Duration::from_millis(50), forum.clear()).await;
        assert!(cleared.is_err());
        assert_eq!(forum.snapshot().await, seeded);
    }

    #[tokio::test]
    async fn concurrent_creates_get_unique_ids() {
        let forum = Arc::new(forum());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let forum = Arc::clone(&forum);
                tokio::spawn(async move {
                    forum
                        .create_post(new_post("sender", "title", &format!("content {i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 20);
        assert_eq!(ids.first(), Some(&2041));
        assert_eq!(ids.last(), Some(&(2041 + 2 * 19)));
    }

    #[test]
    fn timestamps_are_seconds() {
        let now = unix_timestamp();
        // 2020-01-01 이후, 밀리초 단위가 아님
        assert!(now > 1_577_836_800);
        assert!(now < 10_000_000_000);
    }
}
