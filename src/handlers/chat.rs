use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::chat::{Message, Recipient, Room, RoomSummary};
use crate::utils::jwt::{self, Claims};
use crate::utils::realtime::{self, Broadcaster};
use crate::utils::{response, validation};

#[derive(Deserialize, Validate)]
pub struct NewMessage {
    #[validate(length(min = 1, max = 4000))]
    content: String,
}

/// Loads a room the caller may use: customers only their own, admins any.
async fn load_room(pool: &PgPool, claims: &Claims, room_id: Uuid) -> Result<Room, AppError> {
    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
        .bind(room_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;
    claims.require_self_or_admin(room.customer_id)?;
    Ok(room)
}

/// The caller's own room, created on first access.
pub async fn get_my_room(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    if claims.is_admin() {
        return Err(AppError::BadRequest("Admins reply from the room list".to_string()));
    }
    let customer_id = claims.user_id()?;

    let room = sqlx::query_as::<_, Room>(
        "INSERT INTO rooms (id, customer_id, created_at) VALUES ($1, $2, $3)
         ON CONFLICT (customer_id) DO UPDATE SET customer_id = EXCLUDED.customer_id
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(Utc::now())
    .fetch_one(&**pool)
    .await?;

    Ok(response::ok("Room retrieved", room))
}

/// Admin inbox: every room with its latest message and unread count.
pub async fn get_rooms(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let rooms = sqlx::query_as::<_, RoomSummary>(
        "SELECT r.id, r.customer_id, u.name AS customer_name, u.company,
                last.content AS last_message, last.timestamp AS last_timestamp,
                (SELECT COUNT(*) FROM messages m
                  WHERE m.room_id = r.id AND m.receiver_id IS NULL AND NOT m.is_read) AS unread_count
         FROM rooms r
         JOIN users u ON u.id = r.customer_id
         LEFT JOIN LATERAL (
             SELECT content, timestamp FROM messages
             WHERE room_id = r.id ORDER BY timestamp DESC LIMIT 1
         ) last ON TRUE
         ORDER BY last.timestamp DESC NULLS LAST",
    )
    .fetch_all(&**pool)
    .await?;

    Ok(response::ok("Rooms retrieved", rooms))
}

pub async fn get_messages(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    room_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let room = load_room(&pool, &claims, room_id.into_inner()).await?;

    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE room_id = $1 ORDER BY timestamp ASC",
    )
    .bind(room.id)
    .fetch_all(&**pool)
    .await?;
    Ok(response::ok("Messages retrieved", messages))
}

/// Stores a message, then pushes it to the room's channel.
pub async fn send_message(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    broadcaster: web::Data<Broadcaster>,
    room_id: web::Path<Uuid>,
    new_message: web::Json<NewMessage>,
) -> Result<HttpResponse, AppError> {
    validation::validate_payload(&new_message.0)?;
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let content = validation::required("content", &new_message.content)?;
    let room = load_room(&pool, &claims, room_id.into_inner()).await?;

    let sender_id = claims.user_id()?;
    // Admin replies go to the customer; customer messages go to the admin pool.
    let receiver_id = Recipient::sent_in(sender_id, room.customer_id).receiver_id();

    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (id, room_id, sender_id, receiver_id, content, is_read, timestamp)
         VALUES ($1, $2, $3, $4, $5, FALSE, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(room.id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(&content)
    .bind(Utc::now())
    .fetch_one(&**pool)
    .await?;

    broadcaster
        .publish(&realtime::room_channel(room.id), realtime::EVENT_NEW_MESSAGE, &message)
        .await?;

    Ok(response::created("Message sent", message))
}

/// Marks the messages addressed to the caller in a room as read: the admin
/// pool's for admins, the customer's own otherwise.
pub async fn mark_read(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    room_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let room = load_room(&pool, &claims, room_id.into_inner()).await?;
    let reader = Recipient::reader(claims.is_admin(), claims.user_id()?);

    let mut query: sqlx::QueryBuilder<'_, sqlx::Postgres> =
        sqlx::QueryBuilder::new("UPDATE messages SET is_read = TRUE WHERE NOT is_read AND room_id = ");
    query.push_bind(room.id);
    reader.push_filter(&mut query);

    let updated = query.build().execute(&**pool).await?.rows_affected();

    Ok(response::ok("Messages marked as read", updated))
}
