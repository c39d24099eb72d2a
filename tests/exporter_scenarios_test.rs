//! Poll-cycle scenario tests against a scripted heat source

use async_trait::async_trait;
use myheat_exporter::demand::DemandAccumulator;
use myheat_exporter::error::{ExporterError, Result};
use myheat_exporter::exporter::Exporter;
use myheat_exporter::metrics::MetricSink;
use myheat_exporter::myheat::{
    Device, DeviceInfo, EnvReading, GetDeviceInfoResponse, GetDevicesResponse, HeatSource,
};
use myheat_exporter::tariff::TariffSelector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn device(id: i64, name: &str) -> Device {
    Device {
        id,
        name: name.to_string(),
        city: "Tver".to_string(),
        severity: 1,
        severity_desc: "ok".to_string(),
    }
}

fn devices_response(devices: Vec<Device>) -> GetDevicesResponse {
    let mut data = HashMap::new();
    data.insert("devices".to_string(), devices);
    GetDevicesResponse {
        data,
        err: 0,
        refresh_page: false,
    }
}

fn room_reading(id: i64, name: &str, value: f64, target: f64, demand: bool) -> EnvReading {
    EnvReading {
        id,
        name: name.to_string(),
        env_type: "room_temperature".to_string(),
        value,
        target,
        demand,
        severity: 1,
        severity_desc: "ok".to_string(),
    }
}

fn detail_response(weather_temp: f64, envs: Vec<EnvReading>) -> GetDeviceInfoResponse {
    GetDeviceInfoResponse {
        data: DeviceInfo {
            city: "Tver".to_string(),
            data_actual: true,
            weather_temp,
            severity: 1,
            severity_desc: "ok".to_string(),
            envs,
        },
        err: 0,
        refresh_page: false,
    }
}

/// Scripted vendor API: a fixed device list plus per-device detail outcomes
struct ScriptedSource {
    list_error_code: Option<i64>,
    devices: Vec<Device>,
    failing_detail_ids: Vec<i64>,
    details: HashMap<i64, Vec<EnvReading>>,
    detail_calls: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    fn new(devices: Vec<Device>) -> Self {
        Self {
            list_error_code: None,
            devices,
            failing_detail_ids: Vec::new(),
            details: HashMap::new(),
            detail_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HeatSource for ScriptedSource {
    async fn get_devices(&self) -> Result<GetDevicesResponse> {
        if let Some(code) = self.list_error_code {
            return Err(ExporterError::api(format!(
                "getDevices: server returned error code {}",
                code
            )));
        }
        Ok(devices_response(self.devices.clone()))
    }

    async fn get_device_info(&self, device_id: i64) -> Result<GetDeviceInfoResponse> {
        self.detail_calls.lock().unwrap().push(device_id);
        if self.failing_detail_ids.contains(&device_id) {
            return Err(ExporterError::network("connection refused"));
        }
        let envs = self.details.get(&device_id).cloned().unwrap_or_default();
        Ok(detail_response(-3.5, envs))
    }
}

fn exporter_over(source: ScriptedSource) -> (Exporter<ScriptedSource>, Arc<MetricSink>, Arc<DemandAccumulator>) {
    let sink = Arc::new(MetricSink::new().unwrap());
    let accumulator = Arc::new(DemandAccumulator::new(
        TariffSelector::system(vec![]),
        Arc::clone(&sink),
    ));
    let exporter = Exporter::new(
        Duration::from_secs(30),
        source,
        Arc::clone(&sink),
        Arc::clone(&accumulator),
    );
    (exporter, sink, accumulator)
}

#[tokio::test]
async fn one_failing_device_does_not_abort_the_cycle() {
    let mut source = ScriptedSource::new(vec![device(1, "Home A"), device(2, "Home B")]);
    source.failing_detail_ids = vec![1];
    source
        .details
        .insert(2, vec![room_reading(7, "Living room", 21.5, 23.0, true)]);

    let (exporter, sink, accumulator) = exporter_over(source);
    exporter.pull().await.unwrap();

    let body = sink.render().unwrap();
    // Device B's readings landed
    assert!(body.contains(r#"myheat_env_temp_current{id="7",name="Living room"} 21.5"#));
    assert!(body.contains(r#"myheat_env_temp_target{id="7",name="Living room"} 23"#));
    assert!(body.contains(r#"myheat_env_heat_demand{id="7",name="Living room"} 1"#));
    assert!(body.contains(r#"myheat_dev_weather_temp{city="Tver",id="2",name="Home B"} -3.5"#));
    // Device A contributed nothing
    assert!(!body.contains(r#"name="Home A""#));

    // The demand sample reached the accumulator
    accumulator.tick();
    let body = sink.render().unwrap();
    assert!(
        body.contains(r#"myheat_env_heat_demand_seconds_total{id="7",name="Living room"} 1"#)
    );
}

#[tokio::test]
async fn both_devices_are_attempted() {
    let mut source = ScriptedSource::new(vec![device(1, "Home A"), device(2, "Home B")]);
    source.failing_detail_ids = vec![1];

    let (exporter, _sink, _accumulator) = exporter_over(source);
    exporter.pull().await.unwrap();

    let calls = exporter_detail_calls(&exporter);
    assert_eq!(calls, vec![1, 2]);
}

#[tokio::test]
async fn device_list_error_ends_the_cycle_without_metric_writes() {
    let mut source = ScriptedSource::new(vec![device(1, "Home A")]);
    source.list_error_code = Some(1);

    let (exporter, sink, _accumulator) = exporter_over(source);
    let err = exporter.pull().await.unwrap_err();
    assert!(matches!(err, ExporterError::Api { .. }));

    let body = sink.render().unwrap();
    assert!(!body.contains("myheat_env_temp_current{"));
    assert!(!body.contains("myheat_dev_weather_temp{"));
}

#[tokio::test]
async fn empty_device_list_is_a_successful_noop() {
    let source = ScriptedSource::new(vec![]);

    let (exporter, sink, _accumulator) = exporter_over(source);
    exporter.pull().await.unwrap();

    let body = sink.render().unwrap();
    assert!(!body.contains("myheat_env_temp_current{"));
}

#[tokio::test]
async fn device_without_readings_is_skipped_entirely() {
    // No envs: weather and severity updates are skipped too
    let source = ScriptedSource::new(vec![device(1, "Home A")]);

    let (exporter, sink, _accumulator) = exporter_over(source);
    exporter.pull().await.unwrap();

    let body = sink.render().unwrap();
    assert!(!body.contains("myheat_dev_weather_temp{"));
    assert!(!body.contains("myheat_dev_severity{"));
}

#[tokio::test]
async fn non_room_readings_are_filtered_out() {
    let mut source = ScriptedSource::new(vec![device(2, "Home B")]);
    let mut boiler = room_reading(9, "Boiler", 55.0, 60.0, true);
    boiler.env_type = "boiler".to_string();
    source
        .details
        .insert(2, vec![boiler, room_reading(7, "Living room", 21.5, 23.0, false)]);

    let (exporter, sink, _accumulator) = exporter_over(source);
    exporter.pull().await.unwrap();

    let body = sink.render().unwrap();
    assert!(body.contains(r#"myheat_env_temp_current{id="7",name="Living room"} 21.5"#));
    assert!(!body.contains(r#"name="Boiler""#));
}

fn exporter_detail_calls(exporter: &Exporter<ScriptedSource>) -> Vec<i64> {
    exporter.client().detail_calls.lock().unwrap().clone()
}
