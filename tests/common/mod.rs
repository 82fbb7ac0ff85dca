use axum::Router;

pub const TEST_TOKEN: &str = "test-token";

pub fn create_test_app() -> Router {
    std::env::set_var("API_AUTH_TOKEN", TEST_TOKEN);
    std::env::set_var("DESKTOP_MODE", "false");
    std::env::remove_var("LLM_API_KEY");
    std::env::remove_var("TTS_API_KEY");

    duihua_backend_rust::create_app()
}
