/*!
 * Common test utilities for the subtrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use subtrans::credentials::MemoryCredentialStore;
use subtrans::providers::{ProviderRegistry, TranslationProvider};
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle_processor::SubtitleEntry;
use subtrans::tasks::{QueueOptions, TaskQueue};
use subtrans::translation::BatchOptions;

/// Three-entry file used by the end-to-end scenarios
pub const HELLO_WORLD_SRT: &str = "1
00:00:01,000 --> 00:00:02,000
Hello

2
00:00:03,000 --> 00:00:04,000
World

3
00:00:05,000 --> 00:00:06,000
!
";

/// Routes library logs to the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, HELLO_WORLD_SRT)
}

/// Entries 1..=count with distinct timings
pub fn sample_entries(count: u64) -> Vec<SubtitleEntry> {
    (1..=count)
        .map(|id| SubtitleEntry::new(id, id * 2000, id * 2000 + 1500, format!("Line {}", id)))
        .collect()
}

/// Queue wired to a mock provider, a stored key and no inter-batch delay
pub fn queue_with_mock(provider: MockProvider, batch_size: usize) -> TaskQueue {
    let mut registry = ProviderRegistry::new();
    let kind = provider.kind();
    registry.register(Arc::new(provider));

    let options = QueueOptions {
        provider: kind,
        target_language: "Vietnamese".to_string(),
        default_prompt: String::new(),
        batch: BatchOptions::new(batch_size, Duration::ZERO),
    };
    TaskQueue::new(registry, Arc::new(MemoryCredentialStore::with_key(kind, "test-key")), options)
}

/// Request line, headers and body of one request received by the HTTP stub
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

/// Serve exactly one canned HTTP response on a loopback port
///
/// Returns the base URL and a handle resolving to the request that was received.
pub async fn serve_once(status_line: &str, body: &str) -> Result<(String, JoinHandle<CapturedRequest>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return CapturedRequest::default();
        };
        let request = read_request(&mut socket).await;
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        request
    });

    Ok((base_url, handle))
}

/// Accept one connection and never answer it
pub async fn serve_silence(hold_for: Duration) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = read_request(&mut socket).await;
            tokio::time::sleep(hold_for).await;
        }
    });
    Ok(base_url)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return CapturedRequest::default(),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    let body_end = buffer.len().min(header_end + content_length);
    CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buffer[header_end..body_end]).to_string(),
    }
}
