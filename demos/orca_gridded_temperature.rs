use erddapy::{DEFAULT_MAX_RETRIES, ErddapData, get_erddap_data};

fn main() {
    // Example program that calls the library API: pull a year of gridded
    // profiles from the NWEM ORCA mooring ERDDAP server.
    let constraints = [
        ("cast_start_time>=", "2022-01-01T00:00:00Z"),
        ("cast_start_time<=", "2022-12-31T23:59:59Z"),
    ];
    let variables = [
        "sea_water_temperature",
        "sea_water_practical_salinity",
        "sea_water_sigma_theta",
    ];

    let data = get_erddap_data(
        "https://nwem.apl.washington.edu/erddap",
        "orca1_L2_gridded_025",
        "griddap",
        Some(&variables),
        Some(&constraints),
        DEFAULT_MAX_RETRIES,
    );

    match data {
        Some(ErddapData::Grid(grid)) => {
            println!("grid shape: {:?}", grid.shape());
            for variable in &grid.variables {
                println!(
                    "  {} [{}]",
                    variable.name,
                    variable.units.as_deref().unwrap_or("-")
                );
            }
        }
        Some(ErddapData::Table(_)) => unreachable!("griddap requests return grids"),
        None => eprintln!("no data retrieved"),
    }
}
