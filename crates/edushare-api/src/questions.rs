use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use edushare_db::content::ContentKind;
use edushare_db::models::{HelpfulOutcome, SpendOutcome};
use edushare_types::api::{Claims, CreateContentRequest, UpdateQuestionRequest};

use crate::auth::AppState;
use crate::content::{self, ListQuery, validate_content};
use crate::convert::content_response;
use crate::db_call;
use crate::error::ApiError;

/// Asking costs points. The balance is read first and then debited with a
/// conditional update; a concurrent change to the balance loses the race and
/// nothing is written.
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateContentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req)?;

    let cost = state.economy.question_cost;
    let question_id = Uuid::new_v4();
    let (qid, uid) = (question_id.to_string(), claims.sub.to_string());

    let outcome = db_call(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        db.create_question_paid(
            &qid,
            &uid,
            user.points,
            cost,
            req.title.trim(),
            &req.content,
            &req.images,
            &req.tags,
        )
        .map(Some)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    match outcome {
        SpendOutcome::Spent { balance } => {
            info!("user {} asked question {} (balance now {})", claims.sub, question_id, balance);
        }
        SpendOutcome::Insufficient { balance } => {
            return Err(ApiError::InsufficientPoints { balance, cost });
        }
        SpendOutcome::RaceLost => {
            warn!("question by {} lost points race", claims.sub);
            return Err(ApiError::Conflict("points balance changed, try again".into()));
        }
    }

    let qid = question_id.to_string();
    let row = db_call(&state, move |db| db.get_content(ContentKind::Question, &qid))
        .await?
        .ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("question {question_id} vanished after insert"))
        })?;

    Ok((StatusCode::CREATED, Json(content_response(row))))
}

pub async fn list_questions(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::list(&state, ContentKind::Question, query).await?))
}

pub async fn top_questions(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(content::top(&state, ContentKind::Question).await?))
}

pub async fn get_question(
    State(state): State<AppState>,
    WithRejection(Path(question_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        content::detail(&state, ContentKind::Question, question_id, claims.sub).await?,
    ))
}

pub async fn get_question_comments(
    State(state): State<AppState>,
    WithRejection(Path(question_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        content::comments(&state, ContentKind::Question, question_id).await?,
    ))
}

/// Owner-only: mark solved/unsolved and pick the helpful answer.
pub async fn update_question(
    State(state): State<AppState>,
    WithRejection(Path(question_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateQuestionRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.solved.is_none() && req.helpful_comment_id.is_none() {
        return Err(ApiError::Validation("nothing to update".into()));
    }

    let qid = question_id.to_string();
    let question = db_call(&state, move |db| db.get_content(ContentKind::Question, &qid))
        .await?
        .ok_or(ApiError::NotFound)?;
    if question.author_id != claims.sub.to_string() {
        return Err(ApiError::Unauthorized);
    }

    if let Some(comment_id) = req.helpful_comment_id {
        let qid = question_id.to_string();
        let outcome = db_call(&state, move |db| {
            db.set_helpful_comment(&qid, &comment_id.to_string())
        })
        .await?;
        if outcome == HelpfulOutcome::NotAnAnswer {
            return Err(ApiError::NotFound);
        }
        info!("question {} marked comment {} helpful", question_id, comment_id);
    }

    if let Some(solved) = req.solved {
        let qid = question_id.to_string();
        db_call(&state, move |db| db.set_question_solved(&qid, solved)).await?;
    }

    let qid = question_id.to_string();
    let row = db_call(&state, move |db| db.get_content(ContentKind::Question, &qid))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(content_response(row)))
}
