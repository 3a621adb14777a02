use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

/// The real server binary on a free port, memory store, killed on drop
struct ServerProcess {
    base_url: String,
    child: Child,
}

impl ServerProcess {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let child = Command::new(env!("CARGO_BIN_EXE_journal-backend"))
            .env("HOST", "127.0.0.1")
            .env("JOURNAL_API_PORT", port.to_string())
            .env("DATABASE_URL", "")
            .env("PROVIDER_URL", "http://127.0.0.1:9")
            .env("PROVIDER_JWT_SECRET", "server-test-secret")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test]
async fn binary_serves_health_and_guards_entries() -> Result<()> {
    let server = ServerProcess::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;

    let client = reqwest::Client::new();
    let res = client.get(format!("{}/health", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["database"], "ok");

    let res = client.get(format!("{}/entries", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
