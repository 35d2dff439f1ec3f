use pagekit::{FetchEvent, FetchOptions, RetryPolicy, RetryingFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/status/401".to_owned());
    let policy = RetryPolicy::from_env().map_err(anyhow::Error::msg)?;

    let fetcher = RetryingFetcher::new().with_policy(policy);
    fetcher.subscribe(|event| match event {
        FetchEvent::Retrying {
            attempt,
            delay,
            reason,
            ..
        } => eprintln!("attempt {attempt} failed ({reason}), retrying in {delay:?}"),
        FetchEvent::Recovered { attempts, .. } => eprintln!("recovered after {attempts} attempts"),
        FetchEvent::Failed { attempts, .. } => eprintln!("gave up after {attempts} attempts"),
    });

    let response = fetcher
        .fetch(&url, &FetchOptions::new().header("accept", "application/json"))
        .await?;
    println!("{} {}", response.status(), response.text().await?);

    Ok(())
}
