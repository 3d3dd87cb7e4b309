//! 📩 라우트별 핸들러
//!
//! 핸들러는 요청을 추출해서 [`Forum`] 에 넘기고, 결과를 JSON 으로 돌려주기만 합니다.

use std::sync::Arc; // 핸들러들이 공유하는 Forum 상태

// -- ✨ 외부 라이브러리 임포트
use axum::{
    extract::State,          // 앱 상태(Arc<Forum<P>>) 주입
    http::{StatusCode, Uri}, // 404 응답용 상태 코드와 요청 URI
    response::IntoResponse,  // 핸들러 반환 타입 → HTTP 응답
};
use serde::{
    Deserialize, // 쿼리 / 본문 → struct
    Serialize,   // struct → JSON 응답
};
use serde_json::{json, Value}; // `{}` 같은 고정 JSON 응답

// -- ✨ 내부 모듈
use crate::{
    error::{AppError, AppJson, AppQuery}, // 에러 응답 + 커스텀 추출기
    forum::{Forum, NewPost, PostSummary}, // 도메인 서비스와 모델
    persistence::Persistence,             // 저장소 트레이트 (핸들러는 제네릭)
};

// ✨ `{"message": ...}` 응답 (GET /, GET /echo/echo)
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String, // 응답 메시지
}

// ✨ GET /echo/echo 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct EchoParams {
    #[serde(default)]
    pub message: String, // 없으면 빈 문자열
}

// ✨ POST /post/create 응답: `{"postId": 2041}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreated {
    pub post_id: u64, // 새 게시글 ID
}

// ✨ GET /posts/list 응답
#[derive(Debug, Serialize)]
pub struct PostList {
    pub posts: Vec<PostSummary>, // 최신 게시글이 앞에
}

// -- ✨ 핸들러

// GET /
pub async fn root() -> AppJson<Message> {
    tracing::info!("someone accessed the root url");
    AppJson(Message {
        message: "Welcome to the forum server's root URL!".to_owned(),
    })
}

// GET /echo/echo?message=...
pub async fn echo(AppQuery(params): AppQuery<EchoParams>) -> Result<AppJson<Message>, AppError> {
    let message = echo_message(params.message)?;
    Ok(AppJson(Message { message }))
}

/// Returns `message` unchanged, except the literal `"echo"`, which is refused.
// 클라이언트가 에러 경로를 시험해 볼 수 있도록 "echo" 만 거절
fn echo_message(message: String) -> Result<String, AppError> {
    if message == "echo" {
        return Err(AppError::EchoRejected);
    }
    Ok(message)
}

// POST /post/create
pub async fn post_create<P: Persistence>(
    State(forum): State<Arc<Forum<P>>>,
    AppJson(input): AppJson<NewPost>,
) -> Result<AppJson<PostCreated>, AppError> {
    let post_id = forum.create_post(input).await?;
    Ok(AppJson(PostCreated { post_id }))
}

// GET /posts/list
pub async fn posts_list<P: Persistence>(State(forum): State<Arc<Forum<P>>>) -> AppJson<PostList> {
    AppJson(PostList {
        posts: forum.list_posts().await,
    })
}

// DELETE /clear
pub async fn clear<P: Persistence>(
    State(forum): State<Arc<Forum<P>>>,
) -> Result<AppJson<Value>, AppError> {
    forum.clear().await?;
    Ok(AppJson(json!({}))) // 빈 객체
}

/// 🚫 404 fallback
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::warn!(%uri, "no route matched");
    (
        StatusCode::NOT_FOUND,
        format!("route '{}' does not exist on this server", uri.path()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_returns_message_unchanged() {
        assert_eq!(echo_message("helloworld".to_owned()).unwrap(), "helloworld");
        assert_eq!(echo_message(String::new()).unwrap(), "");
        assert_eq!(echo_message("Echo".to_owned()).unwrap(), "Echo");
    }

    #[test]
    fn echo_refuses_echo() {
        let err = echo_message("echo".to_owned()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
