use anyhow::anyhow;
use reqwest::StatusCode;

use crate::util::body_snippet;

/// Extracts the message from an ERDDAP error body.
///
/// ERDDAP reports failures as a quasi-literal block:
///
/// ```text
/// Error {
///     code=404;
///     message="Not Found: Currently unknown datasetID=orca0";
/// }
/// ```
pub(crate) fn parse_error_message(body: &str) -> Option<String> {
    let start = body.find("message=\"")? + "message=\"".len();
    let rest = &body[start..];
    let end = rest.find("\";").or_else(|| rest.rfind('"'))?;
    let message = rest[..end].trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

pub(crate) fn format_erddap_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    let server_msg = parse_error_message(body).unwrap_or_else(|| {
        let snippet = body_snippet(body);
        if snippet.is_empty() {
            "(no response body)".to_string()
        } else {
            snippet.to_string()
        }
    });

    if status == StatusCode::NOT_FOUND {
        return anyhow!(
            "ERDDAP resource not found (HTTP 404).\n- Check the dataset ID and that the dataset is served under the protocol you requested\n- The server's dataset list is at <server>/info/index.html\n- Constraints that select an empty region also report 404 (\"Your query produced no matching results\")\n\nServer message: {}\nrequest: {}",
            server_msg,
            url
        );
    }

    if status == StatusCode::BAD_REQUEST {
        return anyhow!(
            "ERDDAP rejected the request (HTTP 400), usually an unknown variable or a malformed constraint.\n- Constraint keys combine an axis name and a comparator, e.g. \"longitude<=\"\n- Server-side expressions such as max(time)-30 must be valid for the axis\n\nServer message: {}\nrequest: {}",
            server_msg,
            url
        );
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "ERDDAP denied access (HTTP {}). The dataset may be private or the server may require a login this client does not perform.\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            server_msg,
            url
        );
    }

    anyhow!(
        "ERDDAP request failed: HTTP {} for url ({})\n{}",
        status.as_u16(),
        url,
        server_msg
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERROR_BODY: &str = "Error {\n    code=404;\n    message=\"Not Found: Currently unknown datasetID=orca0\";\n}\n";

    #[test]
    fn extracts_quoted_message() {
        assert_eq!(
            parse_error_message(ERROR_BODY).as_deref(),
            Some("Not Found: Currently unknown datasetID=orca0")
        );
        assert_eq!(parse_error_message("<html>oops</html>"), None);
        assert_eq!(parse_error_message("message=\"\";"), None);
    }

    #[test]
    fn formats_not_found_with_guidance() {
        let err = format_erddap_error(StatusCode::NOT_FOUND, "http://e/griddap/x.csv", ERROR_BODY);
        let text = err.to_string();
        assert!(text.contains("unknown datasetID=orca0"));
        assert!(text.contains("dataset ID"));
        assert!(text.contains("http://e/griddap/x.csv"));
    }

    #[test]
    fn falls_back_to_body_snippet() {
        let err = format_erddap_error(StatusCode::BAD_GATEWAY, "http://e", "upstream down");
        assert!(err.to_string().contains("HTTP 502"));
        assert!(err.to_string().contains("upstream down"));

        let err = format_erddap_error(StatusCode::INTERNAL_SERVER_ERROR, "http://e", "");
        assert!(err.to_string().contains("(no response body)"));
    }
}
