macro_rules! retry_store_operation {
    ($label:expr, $operation:expr) => {{
        const MAX_ATTEMPTS: u32 = 3;
        const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(3);

        let label: String = $label.into();
        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            match ($operation).await {
                Ok(value) => break Ok(value),
                Err(err) if attempt >= MAX_ATTEMPTS => break Err(err),
                Err(err) => {
                    log::warn!(
                        "{} failed on attempt {}/{}: {}. Retrying in {}s.",
                        label,
                        attempt,
                        MAX_ATTEMPTS,
                        err,
                        RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        };
        outcome
    }};
}

pub(crate) use retry_store_operation;
