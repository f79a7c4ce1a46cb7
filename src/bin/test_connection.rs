use anyhow::Result;
use dax_optimizer::config::{mask_token, read_api_token, DEFAULT_TOKEN_ENV};
use dax_optimizer::domain::ports::{ChatMessage, CompletionClient, CompletionRequest};
use dax_optimizer::utils::logger;
use dax_optimizer::ChatCompletionClient;

const TROUBLESHOOTING: &str = "\
Possible issues:
1. Token doesn't have access to GitHub Models API
2. Network/firewall blocking the connection
3. GitHub Models API endpoint changed
4. You need GitHub Copilot subscription

Troubleshooting:
- Check your token at: https://github.com/settings/tokens
- Verify you have GitHub Copilot access
- Try regenerating your token
- Check if your network blocks Azure endpoints";

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger(false, false);

    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("GitHub Models API Connection Test");
    println!("{}", rule);

    let token = match read_api_token(DEFAULT_TOKEN_ENV) {
        Ok(token) => {
            println!("\n✅ Token found: {}", mask_token(&token));
            token
        }
        Err(e) => {
            println!("\n❌ {}", e.user_friendly_message());
            println!("\nSet it with:\n  export {}='your_token_here'", DEFAULT_TOKEN_ENV);
            std::process::exit(e.exit_code());
        }
    };

    println!("\n📡 Testing connection to GitHub Models API...");
    let client = ChatCompletionClient::new(token);
    println!("✅ Client created for {}", client.completions_url());

    println!("\n🔄 Sending test request...");
    let request = CompletionRequest {
        messages: vec![ChatMessage::user(
            "Say 'Hello, this is a test!' and nothing else.",
        )],
        temperature: 0.1,
        max_tokens: 50,
    };

    match client.complete(&request).await {
        Ok(reply) => {
            println!("✅ Success! API Response: {}", reply.trim());
            println!("\n🎉 Your connection is working!");
            println!("\nYou can now run dax-optimizer.");
        }
        Err(e) => {
            println!("\n❌ Connection Error: {}", e);
            println!("\n{}", TROUBLESHOOTING);
        }
    }

    println!("\n{}", rule);
    Ok(())
}
