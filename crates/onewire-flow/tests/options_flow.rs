//! Options flow scenarios driven through the flow manager

mod common;

use std::sync::Arc;

use common::{MockHub, TestSetup};
use onewire_config_entries::{ConfigEntry, ConfigEntryUpdate};
use onewire_flow::constants::DOMAIN;
use onewire_flow::{ConfigFlowHandler, FlowError, FlowResult, FlowResultType, OneWireHub};
use onewire_registries::DeviceIdentifier;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// An owserver entry with its hub registered, plus a user name for 28.AAA
async fn configured(hub: MockHub) -> (TestSetup, String) {
    let setup = TestSetup::new(hub);
    let entry = setup
        .entries
        .add(ConfigEntry::new(DOMAIN, "localhost"))
        .await
        .unwrap();

    let device = setup.registry.get_or_create(
        &[DeviceIdentifier::new(DOMAIN, "28.AAA")],
        Some(entry.entry_id.as_str()),
        None,
    );
    setup.registry.set_name_by_user(&device.id, Some("Kitchen"));

    let hub = Arc::clone(&setup.hub) as Arc<dyn OneWireHub>;
    setup.manager.register_hub(&entry.entry_id, hub).await;
    (setup, entry.entry_id)
}

fn bus() -> MockHub {
    MockHub::new()
        .with_device("28.AAA", "DS18B20")
        .with_device("28.BBB", "DS18B20")
        .with_device("10.CCC", "DS18S20")
}

fn placeholder<'a>(result: &'a FlowResult, key: &str) -> Option<&'a str> {
    result
        .description_placeholders
        .as_ref()
        .and_then(|p| p.get(key))
        .map(String::as_str)
}

async fn store_options(setup: &TestSetup, entry_id: &str, options: Value) {
    let Value::Object(options) = options else {
        panic!("options must be an object");
    };
    setup
        .entries
        .update(entry_id, ConfigEntryUpdate::new().options(options))
        .await
        .unwrap();
}

async fn stored_options(setup: &TestSetup, entry_id: &str) -> Value {
    let entries = setup.reload_entries().await;
    Value::Object(entries.get(entry_id).unwrap().options)
}

#[tokio::test]
async fn test_selection_lists_ds18b20_labels() {
    let (setup, entry_id) = configured(bus()).await;

    let result = setup.manager.start_options_flow(&entry_id).await.unwrap();

    assert_eq!(result.step_id.as_deref(), Some("device_selection"));
    let selection = &result.data_schema[1];
    assert_eq!(selection.name, "ds18b20_device_selection");
    assert_eq!(
        selection.options,
        Some(vec!["Kitchen (28.AAA)".to_string(), "28.BBB".to_string()])
    );
}

#[tokio::test]
async fn test_precision_per_device_last_selected_first() {
    let (setup, entry_id) = configured(bus()).await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    let result = setup
        .manager
        .progress_flow(
            &flow_id,
            Some(json!({
                "clear_device_config": false,
                "ds18b20_device_selection": ["Kitchen (28.AAA)", "28.BBB"]
            })),
        )
        .await
        .unwrap();
    assert_eq!(result.step_id.as_deref(), Some("configure_device"));
    assert_eq!(placeholder(&result, "sens_id"), Some("28.BBB"));

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"sensor_precision": "Default"})))
        .await
        .unwrap();
    assert_eq!(placeholder(&result, "sens_id"), Some("Kitchen (28.AAA)"));

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"sensor_precision": "11 Bits"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some(""));

    assert_eq!(
        stored_options(&setup, &entry_id).await,
        json!({
            "ds18b20_device_selection": ["28.AAA", "28.BBB"],
            "sensor_precision": {"28.AAA": "11 Bits", "28.BBB": "Default"}
        })
    );
}

#[tokio::test]
async fn test_nothing_is_stored_before_commit() {
    let (setup, entry_id) = configured(bus()).await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    setup
        .manager
        .progress_flow(&flow_id, Some(json!({"ds18b20_device_selection": ["28.BBB"]})))
        .await
        .unwrap();

    assert!(setup.entries.get(&entry_id).unwrap().options.is_empty());
    assert_eq!(setup.manager.list_flows().await[0]["step_id"], "configure_device");
}

#[tokio::test]
async fn test_clear_resets_stored_options() {
    let (setup, entry_id) = configured(bus()).await;
    store_options(
        &setup,
        &entry_id,
        json!({
            "ds18b20_device_selection": ["28.AAA"],
            "sensor_precision": {"28.AAA": "12 Bits"}
        }),
    )
    .await;

    let result = setup.manager.start_options_flow(&entry_id).await.unwrap();
    assert_eq!(
        result.data_schema[1].default,
        Some(json!(["Kitchen (28.AAA)"]))
    );

    let result = setup
        .manager
        .progress_flow(
            &result.flow_id,
            Some(json!({
                "clear_device_config": true,
                "ds18b20_device_selection": ["28.BBB"]
            })),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(stored_options(&setup, &entry_id).await, json!({}));
}

#[tokio::test]
async fn test_non_ds18b20_device_cannot_be_selected() {
    let (setup, entry_id) = configured(bus()).await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"ds18b20_device_selection": ["10.CCC"]})))
        .await
        .unwrap();

    assert_eq!(result.step_id.as_deref(), Some("device_selection"));
    assert_eq!(
        result
            .errors
            .as_ref()
            .and_then(|e| e.get("ds18b20_device_selection"))
            .map(String::as_str),
        Some("invalid_device")
    );
}

#[tokio::test]
async fn test_every_selected_device_gets_a_precision() {
    let ids = ["28.000000000001", "28.000000000002", "28.000000000003"];
    let hub = ids
        .iter()
        .fold(MockHub::new(), |hub, id| hub.with_device(id, "DS18B20"));
    let (setup, entry_id) = configured(hub).await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    let mut result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"ds18b20_device_selection": ids})))
        .await
        .unwrap();

    let mut visits = 0;
    while result.result_type == FlowResultType::Form {
        visits += 1;
        result = setup
            .manager
            .progress_flow(&flow_id, Some(json!({"sensor_precision": "9 Bits"})))
            .await
            .unwrap();
    }

    assert_eq!(visits, ids.len());
    let options = stored_options(&setup, &entry_id).await;
    assert_eq!(options["sensor_precision"].as_object().unwrap().len(), ids.len());
}

#[tokio::test]
async fn test_selection_without_device_list_reuses_stored_one() {
    let (setup, entry_id) = configured(bus()).await;
    store_options(
        &setup,
        &entry_id,
        json!({
            "ds18b20_device_selection": ["28.BBB"],
            "sensor_precision": {"28.BBB": "10 Bits"}
        }),
    )
    .await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"clear_device_config": false})))
        .await
        .unwrap();
    assert_eq!(result.step_id.as_deref(), Some("configure_device"));
    assert_eq!(placeholder(&result, "sens_id"), Some("28.BBB"));
    assert_eq!(result.data_schema[0].default, Some(json!("10 Bits")));

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"sensor_precision": "12 Bits"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);

    assert_eq!(
        stored_options(&setup, &entry_id).await,
        json!({
            "ds18b20_device_selection": ["28.BBB"],
            "sensor_precision": {"28.BBB": "12 Bits"}
        })
    );
}

#[tokio::test]
async fn test_deselected_device_keeps_its_precision() {
    let (setup, entry_id) = configured(bus().with_device("28.CCC", "DS18B20")).await;
    store_options(
        &setup,
        &entry_id,
        json!({
            "ds18b20_device_selection": ["28.CCC"],
            "sensor_precision": {"28.CCC": "10 Bits"}
        }),
    )
    .await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;

    // A user label and a bare id in the same submission
    let result = setup
        .manager
        .progress_flow(
            &flow_id,
            Some(json!({"ds18b20_device_selection": ["Kitchen (28.AAA)", "28.BBB"]})),
        )
        .await
        .unwrap();
    assert_eq!(placeholder(&result, "sens_id"), Some("28.BBB"));

    for precision in ["9 Bits", "12 Bits"] {
        setup
            .manager
            .progress_flow(&flow_id, Some(json!({"sensor_precision": precision})))
            .await
            .unwrap();
    }

    assert_eq!(
        stored_options(&setup, &entry_id).await,
        json!({
            "ds18b20_device_selection": ["28.AAA", "28.BBB"],
            "sensor_precision": {
                "28.AAA": "12 Bits",
                "28.BBB": "9 Bits",
                "28.CCC": "10 Bits"
            }
        })
    );
}

#[tokio::test]
async fn test_failed_commit_keeps_flow_for_retry() {
    let (setup, entry_id) = configured(bus()).await;
    let flow_id = setup
        .manager
        .start_options_flow(&entry_id)
        .await
        .unwrap()
        .flow_id;
    setup
        .manager
        .progress_flow(&flow_id, Some(json!({"ds18b20_device_selection": ["28.BBB"]})))
        .await
        .unwrap();

    // Make the storage directory unwritable by putting a file in its place
    let storage_dir = setup.temp_dir.path().join(".storage");
    std::fs::remove_dir_all(&storage_dir).unwrap();
    std::fs::write(&storage_dir, "not a directory").unwrap();

    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"sensor_precision": "9 Bits"})))
        .await;
    assert!(matches!(result, Err(FlowError::ConfigEntries(_))));
    assert!(setup.entries.get(&entry_id).unwrap().options.is_empty());

    let flows = setup.manager.list_flows().await;
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0]["step_id"], "configure_device");

    std::fs::remove_file(&storage_dir).unwrap();
    let result = setup
        .manager
        .progress_flow(&flow_id, Some(json!({"sensor_precision": "9 Bits"})))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert!(setup.manager.list_flows().await.is_empty());
    assert_eq!(
        stored_options(&setup, &entry_id).await,
        json!({
            "ds18b20_device_selection": ["28.BBB"],
            "sensor_precision": {"28.BBB": "9 Bits"}
        })
    );
}
