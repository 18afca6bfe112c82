use anyhow::{Context, Result};
use serde::Serialize;
use ulam::GeoPoint;

#[derive(Serialize)]
struct AntipodeResponse {
    point: GeoPoint,
    antipode: GeoPoint,
}

pub fn run(lat: f64, lon: f64, json: bool) -> Result<()> {
    let point = GeoPoint::checked(lat, lon).context("Invalid coordinate")?;
    let antipode = point.antipode();

    if json {
        let response = AntipodeResponse { point, antipode };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{} {}", antipode.lat, antipode.lng);
    }

    Ok(())
}
