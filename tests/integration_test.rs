//! End-to-end tests driving the client against a local stub ERDDAP server.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use erddapy::{ErddapData, FetchRequest, fetch_with_retries, get_erddap_data};

const INFO_JSON: &str = r#"{
    "table": {
        "columnNames": ["Row Type", "Variable Name", "Attribute Name", "Data Type", "Value"],
        "rows": [
            ["attribute", "NC_GLOBAL", "cdm_data_type", "String", "Grid"],
            ["dimension", "time", "", "double", "nValues=2, evenlySpaced=false"],
            ["attribute", "time", "actual_range", "double", "1.6409952E9, 1.6410816E9"],
            ["dimension", "longitude", "", "float", "nValues=3, evenlySpaced=true"],
            ["attribute", "longitude", "actual_range", "float", "-10.0, 30.0"],
            ["variable", "sea_water_temperature", "", "float", ""],
            ["attribute", "sea_water_temperature", "units", "String", "degree_C"]
        ]
    }
}"#;

const GRID_CSV: &str = "\
time,longitude,sea_water_temperature
UTC,degrees_east,degree_C
2022-01-01T00:00:00Z,0.0,10.1
2022-01-01T00:00:00Z,5.0,10.2
2022-01-01T00:00:00Z,10.0,10.3
2022-01-02T00:00:00Z,0.0,10.4
2022-01-02T00:00:00Z,5.0,10.5
2022-01-02T00:00:00Z,10.0,10.6
";

const TABLE_CSV: &str = "\
time,sea_water_temperature
UTC,degree_C
2022-01-01T00:00:00Z,10.1
2022-01-01T01:00:00Z,10.2
";

/// Minimal single-purpose HTTP server: records every request path and
/// answers via the handler, which sees the path and the zero-based hit index.
struct StubServer {
    url: String,
    paths: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    fn start<F>(handler: F) -> StubServer
    where
        F: Fn(&str, usize) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&paths);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle_connection(stream, &handler, &recorded);
            }
        });

        StubServer { url, paths }
    }

    fn hits(&self) -> usize {
        self.paths.lock().expect("paths lock").len()
    }

    fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("paths lock").clone()
    }
}

fn handle_connection<F>(mut stream: TcpStream, handler: &F, recorded: &Arc<Mutex<Vec<String>>>)
where
    F: Fn(&str, usize) -> (u16, String),
{
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    // Drain headers up to the blank line.
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) if header == "\r\n" || header == "\n" => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    let hit = {
        let mut paths = recorded.lock().expect("paths lock");
        paths.push(path.clone());
        paths.len() - 1
    };

    let (status, body) = handler(&path, hit);
    let reason = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

#[test]
fn grid_fetch_returns_labeled_array_with_constrained_extent() {
    let server = StubServer::start(|path, _| {
        if path.starts_with("/info/orca1_gridded/index.json") {
            (200, INFO_JSON.to_string())
        } else if path.starts_with("/griddap/orca1_gridded.csv") {
            (200, GRID_CSV.to_string())
        } else {
            (404, format!("Error {{\n    code=404;\n    message=\"unknown path {path}\";\n}}"))
        }
    });

    let constraints = [("longitude>=", "0"), ("longitude<=", "10")];
    let data = get_erddap_data(
        &server.url,
        "orca1_gridded",
        "griddap",
        None,
        Some(&constraints),
        1,
    )
    .expect("grid fetch succeeds");

    // One metadata request, one data request.
    assert_eq!(server.hits(), 2);
    let data_path = &server.paths()[1];
    assert!(data_path.contains("sea_water_temperature"));
    assert!(data_path.contains("[(0):1:(10)]"), "constrained selector in {data_path}");
    assert!(
        data_path.contains("[(1.6409952E9):1:(1.6410816E9)]"),
        "full time extent in {data_path}"
    );

    let grid = data.as_grid().expect("griddap returns a grid");
    assert_eq!(grid.shape(), vec![2, 3]);
    let longitude = grid.axis("longitude").expect("longitude axis");
    assert!(
        longitude
            .values
            .iter()
            .all(|v| (0.0..=10.0).contains(&v.as_f64().expect("numeric longitude")))
    );
    let temperature = grid.variable("sea_water_temperature").expect("temperature");
    assert_eq!(temperature.data[[1, 2]], 10.6);
}

#[test]
fn table_fetch_returns_requested_columns() {
    let server = StubServer::start(|path, _| {
        if path.starts_with("/tabledap/orca1_ctd.csv") {
            (200, TABLE_CSV.to_string())
        } else {
            (404, String::new())
        }
    });

    let variables = ["sea_water_temperature"];
    let data = get_erddap_data(
        &server.url,
        "orca1_ctd",
        "tabledap",
        Some(&variables),
        None,
        1,
    )
    .expect("table fetch succeeds");

    assert_eq!(server.hits(), 1);
    assert!(server.paths()[0].contains("sea_water_temperature"));

    let table = data.as_table().expect("tabledap returns a table");
    // Requested variables plus the server-mandated time index column.
    assert_eq!(table.column_names(), vec!["time", "sea_water_temperature"]);
    assert_eq!(table.n_rows(), 2);
}

#[test]
fn invalid_protocol_makes_no_network_calls() {
    let server = StubServer::start(|_, _| (200, TABLE_CSV.to_string()));

    let data = get_erddap_data(&server.url, "orca1_ctd", "tabledap2", None, None, 5);

    assert!(data.is_none());
    assert_eq!(server.hits(), 0);
}

#[test]
fn persistent_failure_consumes_exactly_the_retry_budget() {
    let server = StubServer::start(|_, _| {
        (
            500,
            "Error {\n    code=500;\n    message=\"internal error\";\n}".to_string(),
        )
    });

    let request = FetchRequest::tabledap(&server.url, "orca1_ctd");
    let data = fetch_with_retries(&request, 3, Duration::ZERO);

    assert!(data.is_none());
    assert_eq!(server.hits(), 3);
}

#[test]
fn transient_failure_recovers_on_second_attempt() {
    let server = StubServer::start(|_, hit| {
        if hit == 0 {
            (503, "Error {\n    code=503;\n    message=\"busy\";\n}".to_string())
        } else {
            (200, TABLE_CSV.to_string())
        }
    });

    let request = FetchRequest::tabledap(&server.url, "orca1_ctd");
    let data = fetch_with_retries(&request, 5, Duration::ZERO);

    assert_eq!(server.hits(), 2);
    assert!(matches!(data, Some(ErddapData::Table(_))));
}

#[test]
fn exhausted_grid_metadata_failures_are_absorbed() {
    // The info request fails every time; the retry budget still bounds the
    // attempts and the caller sees the absence value, not an error.
    let server = StubServer::start(|_, _| {
        (
            404,
            "Error {\n    code=404;\n    message=\"Currently unknown datasetID=orca0\";\n}"
                .to_string(),
        )
    });

    let request = FetchRequest::griddap(&server.url, "orca0");
    let data = fetch_with_retries(&request, 2, Duration::ZERO);

    assert!(data.is_none());
    assert_eq!(server.hits(), 2);
}
