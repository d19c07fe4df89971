use anyhow::Result;
use std::thread;
use std::time::Duration;

use crate::client::Client;
use crate::data::ErddapData;
use crate::protocol::Protocol;
use crate::request::FetchRequest;

/// Default number of fetch attempts before giving up.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Fixed pause between failed fetch attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Fetches a dataset from an ERDDAP server, retrying transient failures.
///
/// This is the crate's convenience entry point. It never returns an error:
/// every failure, from an invalid protocol string to a connection error or a
/// server rejection, is reported on stderr and absorbed into `None`. Callers
/// that want structured errors should build a [`FetchRequest`] and call
/// [`Client::fetch`] instead.
///
/// - `data_protocol` must be `"griddap"` or `"tabledap"`. Anything else is
///   diagnosed and returns `None` without touching the network.
/// - `variables` restricts the selection; `None` requests all variables.
/// - `constraints` are `(key, value)` pairs such as `("longitude<=", "10")`
///   or `("time>=", "max(time)-30")`; `None` requests the full extent.
/// - Up to `max_retries` attempts are made, with a 10 second pause between
///   them ([`RETRY_DELAY`]).
pub fn get_erddap_data(
    server_url: &str,
    dataset_id: &str,
    data_protocol: &str,
    variables: Option<&[&str]>,
    constraints: Option<&[(&str, &str)]>,
    max_retries: usize,
) -> Option<ErddapData> {
    let protocol = match data_protocol.parse::<Protocol>() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Error occurred in data download. No data has been accessed.");
            return None;
        }
    };

    let mut request = FetchRequest::new(server_url, dataset_id, protocol);
    if let Some(variables) = variables {
        request = request.variables(variables.iter().copied());
    }
    if let Some(constraints) = constraints {
        request = request.constraints(constraints.iter().copied());
    }

    fetch_with_retries(&request, max_retries, RETRY_DELAY)
}

/// Drives [`Client::fetch`] through the retry loop, absorbing all failures
/// into `None`.
///
/// The whole attempt, including the griddap metadata request, sits inside
/// the loop, so every failure mode consumes retry budget and none escapes to
/// the caller.
pub fn fetch_with_retries(
    request: &FetchRequest,
    max_retries: usize,
    delay: Duration,
) -> Option<ErddapData> {
    let client = match Client::for_server(request.server()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Connection error: {e:#}");
            eprintln!("Error occurred in data download. No data has been accessed.");
            return None;
        }
    };

    let data = retry_with_delay(max_retries, delay, || client.fetch(request));
    if data.is_none() {
        eprintln!("Error occurred in data download. No data has been accessed.");
    }
    data
}

/// Bounded retry driver: runs `attempt` up to `max_attempts` times, sleeping
/// `delay` between attempts, and stops on the first success.
///
/// Every error is treated as retryable; the attempt result decides, not the
/// error's cause. The sleep happens only when another attempt follows, so a
/// run with `max_attempts` failures sleeps `max_attempts - 1` times.
pub fn retry_with_delay<T>(
    max_attempts: usize,
    delay: Duration,
    mut attempt: impl FnMut() -> Result<T>,
) -> Option<T> {
    let mut attempts = 0;
    while attempts < max_attempts {
        match attempt() {
            Ok(value) => return Some(value),
            Err(e) => {
                attempts += 1;
                eprintln!("Connection error: {e:#}");
                if attempts < max_attempts {
                    eprintln!(
                        "   ...download attempt #{attempts} failed; waiting {}s before retrying",
                        delay.as_secs()
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;

    #[test]
    fn always_failing_attempt_runs_exactly_max_times() {
        let calls = Cell::new(0usize);
        let result: Option<()> = retry_with_delay(3, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            Err(anyhow!("boom"))
        });
        assert!(result.is_none());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn stops_on_first_success() {
        let calls = Cell::new(0usize);
        let result = retry_with_delay(5, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(anyhow!("transient"))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result, Some(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn zero_attempts_never_runs_the_closure() {
        let calls = Cell::new(0usize);
        let result: Option<()> = retry_with_delay(0, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            Ok(())
        });
        assert!(result.is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn invalid_protocol_returns_none_without_a_client() {
        // The unroutable server URL would fail loudly if any request were
        // attempted; the protocol check has to short-circuit before that.
        let result = get_erddap_data("http://127.0.0.1:0", "orca1", "tabledap2", None, None, 5);
        assert!(result.is_none());
    }
}
