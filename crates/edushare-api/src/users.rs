use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use edushare_db::models::SignOutcome;
use edushare_types::api::{Claims, DailySignResponse, UserProfile};

use crate::auth::AppState;
use crate::convert::parse_time;
use crate::db_call;
use crate::error::ApiError;

pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user_id.to_string();
    let (user, counts) = db_call(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        let counts = db.user_counts(&uid)?;
        Ok(Some((user, counts)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(UserProfile {
        id: user_id,
        name: user.name,
        points: user.points,
        last_sign_date: user.last_sign_date,
        post_count: counts.posts,
        question_count: counts.questions,
        comment_count: counts.comments,
        created_at: parse_time(&user.created_at),
    }))
}

/// PUT /users/{id}/dailySign: once-per-UTC-day reward, self only.
pub async fn daily_sign(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id != claims.sub {
        return Err(ApiError::Unauthorized);
    }

    let reward = state.economy.daily_sign_reward;
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let (uid, day) = (user_id.to_string(), today.clone());

    let outcome = db_call(&state, move |db| {
        let Some(user) = db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        db.daily_sign(&uid, user.points, user.last_sign_date.as_deref(), &day, reward)
            .map(Some)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    match outcome {
        SignOutcome::Signed { points } => {
            info!("user {} signed in for {} (+{})", user_id, today, reward);
            Ok(Json(DailySignResponse {
                points,
                reward,
                last_sign_date: today,
            }))
        }
        SignOutcome::AlreadySigned => Err(ApiError::Conflict("already signed today".into())),
        SignOutcome::RaceLost => {
            warn!("daily sign for {} lost points race", user_id);
            Err(ApiError::Conflict("points balance changed, try again".into()))
        }
    }
}
