use locker_console_client::types::SignInRequest;
use locker_console_client::{ApiClient, Call, ClientConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the demo
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Prefer a JSON file next to the binary, fall back to LOCKER_API_* env vars
    let cfg = ClientConfig::from_file("config.json").or_else(|_| ClientConfig::from_env())?;
    let client = ApiClient::in_memory(cfg)?;

    let phone = std::env::var("LOCKER_PHONE")?;
    let password = std::env::var("LOCKER_PASSWORD")?;
    let me = client
        .sign_in(&SignInRequest {
            phone: Some(phone),
            password: Some(password),
            ..Default::default()
        })
        .await?;
    println!("signed in as {} ({})", me.username, me.role_names.join(", "));

    // Expired access tokens are refreshed transparently from here on
    let lockers: Vec<serde_json::Value> = client
        .call_api(Call::get("/locker/list").query("page", 1))
        .await?;
    println!("{} lockers", lockers.len());

    client.log_out();
    Ok(())
}
