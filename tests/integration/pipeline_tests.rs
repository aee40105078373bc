//! Integration tests: tables → features → dense model from NVS → decision.

use clinipower::adapters::nvs::{MODEL_KEY, MODEL_NAMESPACE, NvsAdapter, load_model_blob};
use clinipower::app::ports::StoragePort;
use clinipower::app::service::{ControlService, time_of_day};
use clinipower::config::SystemConfig;
use clinipower::error::ConfigFault;
use clinipower::features::encoder::CategoryCode;
use clinipower::features::{FeaturePipeline, PowerInputs};
use clinipower::inference::dense::{DenseLayer, DenseModel, ModelBlob};
use clinipower::inference::{InferenceEngine, SCHEMA_VERSION};
use clinipower::tables::DeploymentTables;

fn inputs(time: &'static str) -> PowerInputs<'static> {
    PowerInputs {
        battery_level: 75.0,
        temperature_c: 32.0,
        voltage_v: 230.0,
        current_a: 5.2,
        daily_patients: "Medium",
        criticality: "High",
        weather: "Sunny",
        grid_status: "Available",
        time_of_day: time,
    }
}

fn service() -> ControlService {
    ControlService::new(SystemConfig::default(), &DeploymentTables::builtin().unwrap()).unwrap()
}

/// 9 → 4 model scoring each class from one feature position.
fn picker(positions: [usize; 4]) -> ModelBlob {
    let mut weights = vec![0i8; 36];
    for (o, &i) in positions.iter().enumerate() {
        weights[o * 9 + i] = 1;
    }
    ModelBlob {
        version: SCHEMA_VERSION,
        layers: vec![DenseLayer {
            inputs: 9,
            outputs: 4,
            input_zero_point: 0,
            output_zero_point: 0,
            multiplier: 1.0,
            relu: false,
            weights,
            bias: vec![0; 4],
        }],
    }
}

#[test]
fn reference_inputs_encode_and_quantize() {
    let pipeline = FeaturePipeline::from_tables(&DeploymentTables::builtin().unwrap()).unwrap();
    let prepared = pipeline.prepare(&inputs(time_of_day(Some(8))));
    assert_eq!(
        prepared.codes,
        [
            CategoryCode::Known(2),
            CategoryCode::Known(0),
            CategoryCode::Known(2),
            CategoryCode::Known(0),
            CategoryCode::Known(1),
        ]
    );
    assert_eq!(prepared.quantized, [29, 7, 14, -31, 46, -52, 46, -43, -3]);
}

#[test]
fn unset_clock_encodes_time_of_day_as_unknown() {
    let pipeline = FeaturePipeline::from_tables(&DeploymentTables::builtin().unwrap()).unwrap();
    let prepared = pipeline.prepare(&inputs(time_of_day(None)));
    assert_eq!(prepared.codes[4], CategoryCode::Unknown);
    assert_eq!(prepared.quantized[..8], [29, 7, 14, -31, 46, -52, 46, -43]);
}

#[test]
fn model_blob_from_storage_decodes_to_a_label() {
    let nvs = NvsAdapter::new().unwrap();
    // Scores: battery, temperature, voltage, weather → max is position 6 (46).
    let bytes = picker([0, 1, 2, 6]).to_bytes().unwrap();
    nvs.write(MODEL_NAMESPACE, MODEL_KEY, &bytes).unwrap();

    let svc = service();
    let engine = DenseModel::from_bytes(&load_model_blob(&nvs).unwrap()).unwrap();
    assert_eq!(engine.schema(), svc.expected_schema());
    let mut model = svc.bind_model(engine).unwrap();

    let prepared = svc.pipeline().prepare(&inputs("Morning"));
    let scores = model.run(&prepared.quantized).unwrap();
    assert_eq!(scores.as_slice(), &[29, 7, 14, 46]);

    let decision = svc.labels().decode(&scores).unwrap();
    assert_eq!((decision.class, decision.label), (3, "Solar"));
    assert_eq!(svc.config().command_for(decision.label), Some(4));
}

#[test]
fn blob_with_stale_schema_version_is_fatal() {
    let mut blob = picker([0, 1, 2, 3]);
    blob.version = SCHEMA_VERSION - 1;
    let engine = DenseModel::from_bytes(&blob.to_bytes().unwrap()).unwrap();
    let svc = service();
    assert!(matches!(
        svc.bind_model(engine),
        Err(ConfigFault::SchemaVersion { .. })
    ));
}

#[test]
fn truncated_blob_is_rejected() {
    let bytes = picker([0, 1, 2, 3]).to_bytes().unwrap();
    assert_eq!(
        DenseModel::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err(),
        ConfigFault::ModelBlob
    );
}

#[test]
fn tables_from_json_are_checked_against_the_feature_layout() {
    let mut json: serde_json::Value =
        serde_json::from_str(include_str!("../../assets/clinic_tables.json")).unwrap();
    json["normalization"][3]["scale"] = serde_json::json!(0.0);
    let tables = DeploymentTables::from_json(&json.to_string()).unwrap();
    assert_eq!(
        ControlService::new(SystemConfig::default(), &tables).err(),
        Some(ConfigFault::ZeroScale(3))
    );
}
