use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

pub const SERVICE_NAME: &str = "Tencent webrtc";

#[derive(Debug, Serialize)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub common: bool,
    pub servers: &'static [ServerEndpoint],
    pub recommended: RecommendedSettings,
}

#[derive(Debug, Serialize)]
pub struct ServerEndpoint {
    pub name: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecommendedSettings {
    pub keyint: u32,
    pub output: &'static str,
}

/// Entry registered in OBS's `rtmp-services/services.json`.
pub const WEBRTC_SERVICE: ServiceDefinition = ServiceDefinition {
    name: SERVICE_NAME,
    common: true,
    servers: &[ServerEndpoint {
        name: "Default",
        url: "https://webrtcpush.myqcloud.com/webrtc/v1/pushstream",
    }],
    recommended: RecommendedSettings {
        keyint: 2,
        output: "tencentcloud_output",
    },
};

/// Replace any existing registration with a fresh copy of [`WEBRTC_SERVICE`].
pub fn install_service(path: &Path) -> Result<(), String> {
    let mut document = load_document(path)?;
    let services = services_mut(&mut document)?;
    remove_first_named(services, SERVICE_NAME);
    let entry = serde_json::to_value(&WEBRTC_SERVICE)
        .map_err(|e| format!("failed to serialize service definition: {e}"))?;
    services.push(entry);
    save_document(path, &document)?;
    info!("services: registered {} in {}", SERVICE_NAME, path.display());
    Ok(())
}

pub fn uninstall_service(path: &Path) -> Result<(), String> {
    let mut document = load_document(path)?;
    let services = services_mut(&mut document)?;
    if remove_first_named(services, SERVICE_NAME) {
        info!("services: removed {} from {}", SERVICE_NAME, path.display());
    } else {
        debug!("services: {} not present in {}", SERVICE_NAME, path.display());
    }
    save_document(path, &document)
}

/// Only the first match goes; later duplicates are left alone.
fn remove_first_named(services: &mut Vec<Value>, name: &str) -> bool {
    let position = services
        .iter()
        .position(|service| service.get("name").and_then(Value::as_str) == Some(name));
    match position {
        Some(index) => {
            services.remove(index);
            true
        }
        None => false,
    }
}

fn services_mut(document: &mut Map<String, Value>) -> Result<&mut Vec<Value>, String> {
    document
        .entry("services")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| "services config field \"services\" is not an array".to_string())
}

fn load_document(path: &Path) -> Result<Map<String, Value>, String> {
    let bytes = fs::read(path)
        .map_err(|e| format!("failed to read services config {}: {e}", path.display()))?;
    let body = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes.as_slice());
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!(
            "services config {} is not a JSON object",
            path.display()
        )),
        Err(e) => Err(format!(
            "failed to parse services config {}: {e}",
            path.display()
        )),
    }
}

fn save_document(path: &Path, document: &Map<String, Value>) -> Result<(), String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| format!("failed to serialize services config: {e}"))?;
    fs::write(path, &out)
        .map_err(|e| format!("failed to write services config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_json(path: &Path, value: &Value) {
        fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    fn service_names(document: &Value) -> Vec<String> {
        document["services"]
            .as_array()
            .unwrap()
            .iter()
            .map(|service| service["name"].as_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn definition_matches_services_schema() {
        let value = serde_json::to_value(&WEBRTC_SERVICE).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Tencent webrtc",
                "common": true,
                "servers": [
                    {
                        "name": "Default",
                        "url": "https://webrtcpush.myqcloud.com/webrtc/v1/pushstream"
                    }
                ],
                "recommended": {
                    "keyint": 2,
                    "output": "tencentcloud_output"
                }
            })
        );
    }

    #[test]
    fn install_twice_leaves_single_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        write_json(&path, &json!({ "format_version": 3, "services": [] }));

        install_service(&path).unwrap();
        install_service(&path).unwrap();

        let document = read_json(&path);
        assert_eq!(service_names(&document), [SERVICE_NAME]);
        assert_eq!(document["format_version"], 3);
    }

    #[test]
    fn install_replaces_stale_entry_and_keeps_others_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        write_json(
            &path,
            &json!({
                "services": [
                    { "name": "A", "servers": [] },
                    { "name": SERVICE_NAME, "common": false, "servers": [] },
                    { "name": "B", "servers": [{ "name": "x", "url": "rtmp://b" }] }
                ]
            }),
        );

        install_service(&path).unwrap();

        let document = read_json(&path);
        assert_eq!(service_names(&document), ["A", "B", SERVICE_NAME]);
        assert_eq!(document["services"][0], json!({ "name": "A", "servers": [] }));
        assert_eq!(
            document["services"][1],
            json!({ "name": "B", "servers": [{ "name": "x", "url": "rtmp://b" }] })
        );
        assert_eq!(document["services"][2]["common"], true);
    }

    #[test]
    fn only_first_duplicate_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        write_json(
            &path,
            &json!({
                "services": [
                    { "name": SERVICE_NAME, "tag": 1 },
                    { "name": "A" },
                    { "name": SERVICE_NAME, "tag": 2 }
                ]
            }),
        );

        uninstall_service(&path).unwrap();

        let document = read_json(&path);
        assert_eq!(service_names(&document), ["A", SERVICE_NAME]);
        assert_eq!(document["services"][1]["tag"], 2);
    }

    #[test]
    fn uninstall_without_entry_keeps_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        let original = json!({
            "format_version": 5,
            "services": [{ "name": "Twitch", "common": true, "servers": [] }]
        });
        write_json(&path, &original);

        uninstall_service(&path).unwrap();

        assert_eq!(read_json(&path), original);
    }

    #[test]
    fn install_creates_missing_services_list() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        write_json(&path, &json!({ "format_version": 1 }));

        install_service(&path).unwrap();

        assert_eq!(service_names(&read_json(&path)), [SERVICE_NAME]);
    }

    #[test]
    fn output_uses_four_space_indent_and_raw_unicode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("services.json");
        fs::write(
            &path,
            "\u{feff}{\"services\": [{\"name\": \"斗鱼直播\"}], \"zeta\": 1, \"alpha\": 2}",
        )
        .unwrap();

        uninstall_service(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"services\": [\n        {\n"));
        assert!(text.contains("斗鱼直播"));
        assert!(text.find("\"zeta\"").unwrap() < text.find("\"alpha\"").unwrap());
    }

    #[test]
    fn rejects_missing_or_malformed_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("absent.json");
        assert!(install_service(&missing).unwrap_err().contains("failed to read"));

        let broken = tmp.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(install_service(&broken).unwrap_err().contains("failed to parse"));
        assert_eq!(fs::read_to_string(&broken).unwrap(), "{ not json");

        let list = tmp.path().join("list.json");
        fs::write(&list, "[]").unwrap();
        assert!(uninstall_service(&list).unwrap_err().contains("not a JSON object"));

        let scalar_services = tmp.path().join("scalar.json");
        fs::write(&scalar_services, "{\"services\": 3}").unwrap();
        assert!(install_service(&scalar_services).unwrap_err().contains("not an array"));
    }
}
