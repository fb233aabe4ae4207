pub mod designer;
mod commands;
pub mod error;
pub mod session;

pub use session::{DesignSession, SessionState, SessionView};

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .manage(session::SessionState::new())
        .invoke_handler(tauri::generate_handler![
            commands::keychain::set_api_key,
            commands::keychain::get_api_key,
            commands::keychain::delete_api_key,
            commands::config::get_preference,
            commands::config::set_preference,
            commands::health::run_health_check,
            commands::designer::get_session,
            commands::designer::upload_room_images,
            commands::designer::analyze_room,
            commands::designer::send_design_message,
            commands::designer::toggle_original,
            commands::designer::restart_session,
            commands::designer::save_design_image,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
