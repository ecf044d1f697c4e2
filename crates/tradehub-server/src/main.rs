use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use tradehub_api::middleware::require_auth;
use tradehub_api::{AppState, AppStateInner, admins, auth, chat, listings, master_data, rfqs, sellers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradehub=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("TRADEHUB_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TRADEHUB_DB_PATH").unwrap_or_else(|_| "tradehub.db".into());
    let host = std::env::var("TRADEHUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TRADEHUB_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = tradehub_db::Database::open(&PathBuf::from(&db_path))?;
    seed_super_admin(&db)?;

    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/seller/signup", post(auth::seller_signup))
        .route("/seller/signin", post(auth::seller_signin))
        .route("/buyer/signup", post(auth::buyer_signup))
        .route("/buyer/signin", post(auth::buyer_signin))
        .route("/admin/signin", post(auth::admin_signin))
        .route("/public/master-data", get(master_data::master_data))
        .route("/public/listings", get(listings::public_listings))
        .route("/public/listings/{slug}", get(listings::public_listing_by_slug));

    let protected_routes = Router::new()
        // Seller review
        .route("/admin/sellers", get(sellers::list_sellers))
        .route("/admin/sellers/{id}/approve", post(sellers::approve_seller))
        .route("/admin/sellers/{id}/reject", post(sellers::reject_seller))
        // Admin management
        .route("/admin/admins", get(admins::list_admins).post(admins::create_admin))
        .route("/admin/admins/{id}", put(admins::update_admin).delete(admins::delete_admin))
        // Master data
        .route("/admin/categories", post(master_data::add_category))
        .route(
            "/admin/categories/{id}",
            put(master_data::rename_category).delete(master_data::delete_category),
        )
        .route("/admin/industries", post(master_data::add_industry))
        .route(
            "/admin/industries/{id}",
            put(master_data::rename_industry).delete(master_data::delete_industry),
        )
        .route("/admin/units", post(master_data::add_unit))
        .route(
            "/admin/units/{id}",
            put(master_data::rename_unit).delete(master_data::delete_unit),
        )
        // Listings
        .route("/listing", post(listings::create_listing))
        .route("/listing/mine", get(listings::my_listings))
        .route("/listing/approve/{id}", post(listings::approve_listing))
        .route("/listing/reject/{id}", post(listings::reject_listing))
        // RFQs
        .route("/rfq", post(rfqs::create_rfq))
        .route("/rfq/mine", get(rfqs::my_rfqs))
        .route("/rfq/for-seller", get(rfqs::rfqs_for_seller))
        .route("/rfq/forward/{id}", post(rfqs::forward_rfq))
        .route("/rfq/approve/{id}", post(rfqs::approve_rfq))
        .route("/rfq/reject/{id}", post(rfqs::reject_rfq))
        .route("/rfq/close/{id}", post(rfqs::close_rfq))
        .route("/admin/rfqs", get(rfqs::all_rfqs))
        .route("/admin/stats", get(rfqs::stats))
        // Chat
        .route("/chat/rooms", get(chat::list_rooms))
        .route("/chat/rooms/product/{id}", post(chat::open_product_room))
        .route("/chat/rooms/rfq/{id}", post(chat::open_rfq_room))
        .route(
            "/chat/rooms/{id}/messages",
            get(chat::room_messages).post(chat::send_message),
        )
        .route("/chat/rooms/{id}/read", post(chat::mark_read))
        .route(
            "/chat/messages/{id}",
            put(chat::edit_message).delete(chat::delete_message),
        )
        .route("/chat/messages/{id}/pin", post(chat::pin_message))
        .route("/chat/messages/{id}/reactions", post(chat::toggle_reaction))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("tradehub server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Migrations cannot hash a password, so the super admin is seeded here
/// at startup. Idempotent across restarts (keyed on the unique email).
fn seed_super_admin(db: &tradehub_db::Database) -> anyhow::Result<()> {
    let email =
        std::env::var("TRADEHUB_ADMIN_EMAIL").unwrap_or_else(|_| "admin@tradehub.local".into());
    let password =
        std::env::var("TRADEHUB_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me-now".into());
    let name = std::env::var("TRADEHUB_ADMIN_NAME").unwrap_or_else(|_| "Super Admin".into());

    let hash = tradehub_api::auth::hash_password(&password)?;
    db.ensure_super_admin(&Uuid::new_v4().to_string(), &email, &hash, &name)?;
    info!("Super admin ensured for {}", email);
    Ok(())
}
