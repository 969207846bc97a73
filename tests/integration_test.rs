//! Integration tests for the redplanet server
//!
//! Each test starts its own server on an ephemeral port over freshly written
//! fixture files and talks to it over HTTP.

mod common;

use common::assertions::{assert_approx_eq, assert_array_approx_eq, assert_undefined};
use common::http_client;
use common::test_data::{self, Fixtures};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use std::net::SocketAddr;

use redplanet::datasets::craters::Crater;
use redplanet::handlers::craters::CraterListResponse;
use redplanet::handlers::point::PointResponse;
use redplanet::handlers::region::RegionResponse;
use redplanet::{AppState, Config};

/// A running server and the files it reads from
struct TestServer {
    addr: SocketAddr,
    _fixtures: Fixtures,
}

/// Start a test server over the fixtures, letting `tweak` adjust the config
async fn start_test_server_with(tweak: impl FnOnce(&mut Config)) -> TestServer {
    let fixtures = Fixtures::create().expect("Failed to write fixtures");
    let mut config = fixtures.config();
    tweak(&mut config);
    config.validate().expect("Fixture config should be valid");

    let state = AppState::new_shared(config).expect("Failed to build app state");
    let app = redplanet::handlers::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    println!("Test server ready on {}", addr);
    TestServer {
        addr,
        _fixtures: fixtures,
    }
}

async fn start_test_server() -> TestServer {
    start_test_server_with(|_| {}).await
}

async fn point(addr: &SocketAddr, query: &str) -> PointResponse {
    http_client::get_json(addr, &format!("/point?{}", query))
        .await
        .expect("Point request failed")
}

#[tokio::test]
async fn test_heartbeat_endpoint() {
    let server = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&server.addr, "/heartbeat")
        .await
        .expect("Heartbeat request failed");

    assert_eq!(json["status"], "healthy");
    assert!(json["server_id"].is_string());
    assert_eq!(json["loaded_datasets"], serde_json::json!([]));
    assert_eq!(
        json["configured_datasets"],
        serde_json::json!(["grs", "crust", "mag", "heat"])
    );
}

#[tokio::test]
async fn test_metadata_catalogue() {
    let server = start_test_server().await;

    let json: serde_json::Value = http_client::get_json(&server.addr, "/metadata")
        .await
        .expect("Metadata request failed");

    assert_eq!(json["nan_sentinel"], -1e10);
    assert_eq!(json["default_method"], "linear");
    let datasets = json["datasets"].as_array().expect("datasets should be a list");
    assert_eq!(datasets.len(), 4);
    assert_eq!(datasets[1]["dataset"], "crust");
    assert_eq!(
        datasets[1]["quantities"],
        serde_json::json!(["topo", "moho", "crust", "rho"])
    );
    assert!(datasets.iter().all(|d| d["configured"] == true));
}

#[tokio::test]
async fn test_metadata_for_dataset_loads_it() {
    let server = start_test_server().await;

    let info: serde_json::Value = http_client::get_json(&server.addr, "/metadata?dataset=crust")
        .await
        .expect("Metadata request failed");
    assert_eq!(info["dataset"], "crust");
    assert_eq!(info["model"]["name"], "Khan2022-40-2900-2800");

    let heartbeat: serde_json::Value = http_client::get_json(&server.addr, "/heartbeat")
        .await
        .expect("Heartbeat request failed");
    assert_eq!(heartbeat["loaded_datasets"], serde_json::json!(["crust"]));
    assert!(heartbeat["data_memory_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_point_grs() {
    let server = start_test_server().await;

    let response = point(&server.addr, "dataset=grs&quantity=th&lon=40&lat=20").await;
    assert!(!response.undefined);
    assert_approx_eq(response.value, test_data::GRS_TH_PPM * 1e-6, Some(1e-15));

    // Volatile-free: divided by 1 - (cl + h2o + s)
    let response = point(
        &server.addr,
        "dataset=grs&quantity=th&lon=220&lat=20&normalize=true",
    )
    .await;
    let volatiles = (test_data::GRS_CL_WT + test_data::GRS_H2O_WT + test_data::GRS_S_WT) * 0.01;
    assert_approx_eq(
        response.value,
        test_data::GRS_TH_PPM * 1e-6 / (1.0 - volatiles),
        Some(1e-15),
    );

    let response = point(
        &server.addr,
        "dataset=grs&quantity=th:sigma&lon=40&lat=20&method=nearest",
    )
    .await;
    assert_approx_eq(response.value, 0.1e-6, Some(1e-15));
}

#[tokio::test]
async fn test_point_missing_measurement_is_undefined() {
    let server = start_test_server().await;

    let response = point(
        &server.addr,
        "dataset=grs&quantity=k&lon=-177.5&lat=-87.5&method=nearest",
    )
    .await;
    assert!(response.undefined);
    assert_undefined(response.value);
}

#[tokio::test]
async fn test_point_crust() {
    let server = start_test_server().await;

    let north = point(&server.addr, "dataset=crust&quantity=crust&lon=45&lat=45").await;
    assert_approx_eq(north.value, test_data::TOPO_NORTH - test_data::MOHO, None);

    let south = point(&server.addr, "dataset=crust&quantity=crthick&lon=45&lat=-45").await;
    assert_eq!(south.quantity, "crthick");
    assert_approx_eq(south.value, test_data::TOPO_SOUTH - test_data::MOHO, None);

    let rho_north = point(&server.addr, "dataset=crust&quantity=rho&lon=45&lat=45").await;
    let rho_south = point(&server.addr, "dataset=crust&quantity=rho&lon=45&lat=-45").await;
    assert_eq!(rho_north.value, test_data::RHO_NORTH);
    assert_eq!(rho_south.value, test_data::RHO_SOUTH);

    // Both longitude conventions address the same place
    let signed = point(&server.addr, "dataset=crust&quantity=topo&lon=-135&lat=45").await;
    let positive = point(&server.addr, "dataset=crust&quantity=topo&lon=225&lat=45").await;
    assert_eq!(signed.value, positive.value);
}

#[tokio::test]
async fn test_point_mag() {
    let server = start_test_server().await;

    let response = point(&server.addr, "dataset=mag&quantity=Br&lon=100&lat=10").await;
    assert_approx_eq(response.value, 10.0, None);

    let response = point(&server.addr, "dataset=mag&quantity=bmag&lon=-180&lat=0").await;
    assert_approx_eq(response.value, test_data::BMAG, None);
}

#[tokio::test]
async fn test_point_heat() {
    let server = start_test_server().await;

    let h = point(&server.addr, "dataset=heat&quantity=H&lon=45&lat=45").await;
    assert!(!h.undefined);
    assert!(h.value > 0.0);

    let flow = point(&server.addr, "dataset=heat&quantity=heat_flow&lon=45&lat=45").await;
    let thickness = test_data::TOPO_NORTH - test_data::MOHO;
    let expected = test_data::RHO_NORTH * h.value * thickness * 1e6;
    assert_approx_eq(flow.value, expected, Some(expected.abs() * 1e-9));

    let temp = point(
        &server.addr,
        "dataset=heat&quantity=temp_at_depth:10&lon=45&lat=45&q_b_mw=20",
    )
    .await;
    assert!(temp.value > 0.0);

    let depth = point(
        &server.addr,
        "dataset=heat&quantity=depth_at_temp:-5&lon=45&lat=45",
    )
    .await;
    assert!(depth.undefined);
}

#[tokio::test]
async fn test_point_errors() {
    let server = start_test_server().await;

    let (status, body) = http_client::get_error(
        &server.addr,
        "/point?dataset=mag&quantity=Br&lon=200&lat=0",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "range");
    assert!(body["request_id"].is_string());

    let (status, body) = http_client::get_error(
        &server.addr,
        "/point?dataset=crust&quantity=topo&lon=0&lat=95",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "range");

    let (status, body) = http_client::get_error(
        &server.addr,
        "/point?dataset=crust&quantity=gravity&lon=0&lat=0",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_quantity");

    let (status, _) = http_client::get_error(
        &server.addr,
        "/point?dataset=mag&quantity=Br&lon=0&lat=0&method=cubic",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_region_spacing() {
    let server = start_test_server().await;

    let response: RegionResponse = http_client::get_json(
        &server.addr,
        "/region?dataset=mag&quantity=Br&lon_min=-10&lon_max=10&lat_min=-10&lat_max=10&spacing=10",
    )
    .await
    .expect("Region request failed");

    assert_eq!(response.lons, vec![-10.0, 0.0, 10.0]);
    assert_eq!(response.lats, vec![-10.0, 0.0, 10.0]);
    assert_eq!(response.undefined_count, 0);
    for (row, lat) in response.values.iter().zip(&response.lats) {
        assert_array_approx_eq(row, &[*lat; 3], None);
    }
}

#[tokio::test]
async fn test_region_points_count_undefined() {
    let server = start_test_server().await;

    let response: RegionResponse = http_client::get_json(
        &server.addr,
        "/region?dataset=grs&quantity=th&lons=-177.5,40&lats=-87.5,20&method=nearest",
    )
    .await
    .expect("Region request failed");

    assert_eq!(response.values.len(), 2);
    assert_undefined(response.values[0][0]);
    assert_eq!(response.undefined_count, 1);
}

#[tokio::test]
async fn test_region_too_large() {
    let server = start_test_server_with(|config| config.data.max_region_points = 4).await;

    let (status, body) = http_client::get_error(
        &server.addr,
        "/region?dataset=mag&quantity=Br&lon_min=0&lon_max=10&lat_min=0&lat_max=10&lon_count=3&lat_count=3",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["kind"], "payload_too_large");
}

#[tokio::test]
async fn test_region_huge_mesh_rejected_and_server_survives() {
    let server = start_test_server().await;

    for query in [
        "lon_min=0&lon_max=10&lat_min=0&lat_max=0&lon_count=1099511627776&lat_count=1",
        "lon_min=0&lon_max=10&lat_min=0&lat_max=0&spacing=1e-12",
    ] {
        let (status, body) = http_client::get_error(
            &server.addr,
            &format!("/region?dataset=crust&quantity=topo&{}", query),
        )
        .await
        .expect("Request failed");
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "payload_too_large");
    }

    let json: serde_json::Value = http_client::get_json(&server.addr, "/heartbeat")
        .await
        .expect("Server should still answer");
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_unconfigured_dataset_is_unavailable() {
    let server = start_test_server_with(|config| config.data.mag_path = None).await;

    let (status, body) = http_client::get_error(
        &server.addr,
        "/point?dataset=mag&quantity=Br&lon=0&lat=0",
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "dataset_unavailable");
}

#[tokio::test]
async fn test_craters_listing() {
    let server = start_test_server().await;

    let all: CraterListResponse = http_client::get_json(&server.addr, "/craters")
        .await
        .expect("Crater request failed");
    assert_eq!(all.count, 4);
    assert_eq!(all.max_diam, 9999.0);

    let some: CraterListResponse =
        http_client::get_json(&server.addr, "/craters?min_diam=45&max_diam=154")
            .await
            .expect("Crater request failed");
    let ids: Vec<&str> = some.craters.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["08-000001", "13-000003"]);

    let heartbeat: serde_json::Value = http_client::get_json(&server.addr, "/heartbeat")
        .await
        .expect("Heartbeat request failed");
    assert_eq!(heartbeat["craters_loaded"], true);
}

#[tokio::test]
async fn test_crater_lookup() {
    let server = start_test_server().await;

    let gale: Crater = http_client::get_json(&server.addr, "/craters/gALe")
        .await
        .expect("Crater lookup failed");
    assert_eq!(gale.id, "08-000001");
    assert_approx_eq(gale.diameter_km, 154.0, None);

    let unnamed: Crater = http_client::get_json(&server.addr, "/craters/12-000002")
        .await
        .expect("Crater lookup failed");
    assert_eq!(unnamed.name, None);

    let (status, body) = http_client::get_error(&server.addr, "/craters/Olympus")
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_crater");
}
