//! MyHeat cloud API client
//!
//! The vendor exposes a single JSON-over-HTTP POST endpoint; the request body
//! selects the action. Every response carries an `err` code (0 = success) and
//! several numeric fields arrive either as numbers or as string-encoded
//! numbers, so decoding is tolerant of both and the rest of the crate only
//! ever sees clean `f64`s.

use crate::config::MyHeatConfig;
use crate::error::{ExporterError, Result};
use crate::logging::{StructuredLogger, get_logger};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Reading type carrying room temperature and heat demand
pub const ENV_TYPE_ROOM_TEMPERATURE: &str = "room_temperature";

/// Known device severity values (the vendor documents no complete list)
pub const DEV_SEVERITY_NORMAL: i64 = 1;
pub const DEV_SEVERITY_LOW_BALANCE: i64 = 32;

const SUCCESS_RESPONSE: i64 = 0;

#[derive(Debug, Clone, Copy, Serialize)]
enum Action {
    #[serde(rename = "getDevices")]
    GetDevices,
    #[serde(rename = "getDeviceInfo")]
    GetDeviceInfo,
}

#[derive(Debug, Serialize)]
struct GetDevicesRequest<'a> {
    action: Action,
    login: &'a str,
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct GetDeviceInfoRequest<'a> {
    action: Action,
    #[serde(rename = "deviceId")]
    device_id: i64,
    login: &'a str,
    key: &'a str,
}

/// One heating controller as listed by `getDevices`
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub severity: i64,
    #[serde(rename = "severityDesc", default)]
    pub severity_desc: String,
}

/// Envelope for `getDevices`
#[derive(Debug, Default, Deserialize)]
pub struct GetDevicesResponse {
    #[serde(default)]
    pub data: HashMap<String, Vec<Device>>,
    #[serde(default)]
    pub err: i64,
    #[serde(rename = "refreshPage", default)]
    pub refresh_page: bool,
}

impl GetDevicesResponse {
    /// The device list, empty when absent from the payload
    pub fn devices(&self) -> &[Device] {
        self.data.get("devices").map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One environment reading inside `getDeviceInfo`
#[derive(Debug, Clone, Deserialize)]
pub struct EnvReading {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub env_type: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub value: f64,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub target: f64,
    #[serde(default)]
    pub demand: bool,
    #[serde(default)]
    pub severity: i64,
    #[serde(rename = "severityDesc", default)]
    pub severity_desc: String,
}

/// Device-level detail from `getDeviceInfo`
#[derive(Debug, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub city: String,
    #[serde(rename = "dataActual", default)]
    pub data_actual: bool,
    #[serde(rename = "weatherTemp", default, deserialize_with = "flexible_f64")]
    pub weather_temp: f64,
    #[serde(default)]
    pub severity: i64,
    #[serde(rename = "severityDesc", default)]
    pub severity_desc: String,
    #[serde(default)]
    pub envs: Vec<EnvReading>,
}

/// Envelope for `getDeviceInfo`
#[derive(Debug, Default, Deserialize)]
pub struct GetDeviceInfoResponse {
    #[serde(default)]
    pub data: DeviceInfo,
    #[serde(default)]
    pub err: i64,
    #[serde(rename = "refreshPage", default)]
    pub refresh_page: bool,
}

/// Decode a JSON number or a string-encoded number into `f64`
///
/// Observed in the wild for `weatherTemp`, `value` and `target`; e.g.
/// `"1.4600000000000364"`.
fn flexible_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Fetch boundary of the vendor API, mockable for poll-cycle tests
#[async_trait]
pub trait HeatSource: Send + Sync {
    /// Fetch the device list
    async fn get_devices(&self) -> Result<GetDevicesResponse>;

    /// Fetch detail for one device
    async fn get_device_info(&self, device_id: i64) -> Result<GetDeviceInfoResponse>;
}

/// HTTP client for the MyHeat API
pub struct MyHeatClient {
    cfg: MyHeatConfig,
    http: reqwest::Client,
    logger: StructuredLogger,
}

impl MyHeatClient {
    /// Create a client; requires validated credentials
    pub fn new(cfg: MyHeatConfig) -> Result<Self> {
        cfg.validate()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            cfg,
            http,
            logger: get_logger("myheat"),
        })
    }

    async fn post<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(&self.cfg.endpoint_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::network(format!(
                "{}: server responded with HTTP {}",
                action, status
            )));
        }

        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl HeatSource for MyHeatClient {
    async fn get_devices(&self) -> Result<GetDevicesResponse> {
        self.logger.debug("getDevices - sending request");

        let request = GetDevicesRequest {
            action: Action::GetDevices,
            login: &self.cfg.login,
            key: &self.cfg.key,
        };
        let response: GetDevicesResponse = self.post("getDevices", &request).await?;

        if response.err != SUCCESS_RESPONSE {
            return Err(ExporterError::api(format!(
                "getDevices: server returned error code {}",
                response.err
            )));
        }

        Ok(response)
    }

    async fn get_device_info(&self, device_id: i64) -> Result<GetDeviceInfoResponse> {
        self.logger
            .debug(&format!("getDeviceInfo - sending request for id={}", device_id));

        let request = GetDeviceInfoRequest {
            action: Action::GetDeviceInfo,
            device_id,
            login: &self.cfg.login,
            key: &self.cfg.key,
        };
        let response: GetDeviceInfoResponse = self.post("getDeviceInfo", &request).await?;

        if response.err != SUCCESS_RESPONSE {
            return Err(ExporterError::api(format!(
                "getDeviceInfo: server returned error code {} for id={}",
                response.err, device_id
            )));
        }

        Ok(response)
    }
}
