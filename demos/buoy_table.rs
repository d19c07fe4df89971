use anyhow::Result;
use erddapy::{Client, FetchRequest};

fn main() -> Result<()> {
    // Tabledap flow with structured errors: one attempt, no retry wrapper.
    let request = FetchRequest::tabledap("https://coastwatch.pfeg.noaa.gov/erddap", "cwwcNDBCMet")
        .variables(["time", "station", "wtmp"])
        .constraint("time>=", "max(time)-1")
        .constraint("station=", "\"46042\"");

    let client = Client::for_server(request.server())?;
    let data = client.fetch(&request)?;

    let table = data.as_table().expect("tabledap requests return tables");
    println!("columns: {:?}", table.column_names());
    println!("rows: {}", table.n_rows());
    Ok(())
}
