//! Descriptor files loaded from disk and run through the host binding.
//! Run with: cargo test -p brisk-edge --test host_binding

use std::path::PathBuf;

use brisk_core::{DeviceKind, ErrorKind};
use brisk_edge::{load, load_with_config, HostArray, NetworkConfig};

const PAD_RELU: &str = r#"{
  "name": "pad_relu",
  "inputs": [{ "name": "x", "dims": [1, 3, 2, 2] }],
  "nodes": [
    { "name": "pad0", "inputs": ["x"], "outputs": ["p"],
      "params": { "op": "pad", "pads": [0, 2, 1, 1, 0, 0, 1, 1], "value": 0.5 } },
    { "name": "act", "inputs": ["p"], "outputs": ["y"], "params": { "op": "relu" } }
  ],
  "outputs": ["y"],
  "config": { "device": "vector_cpu" }
}"#;

fn write_descriptor(tag: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("brisk-{tag}-{}.json", std::process::id()));
    std::fs::write(&path, text).unwrap();
    path
}

fn input() -> HostArray {
    let data: Vec<f32> = (0..12).map(|v| if v % 2 == 0 { v as f32 } else { -(v as f32) }).collect();
    HostArray::new(&[1, 3, 2, 2], data).unwrap()
}

#[test]
fn test_load_and_forward() {
    let path = write_descriptor("pad-relu", PAD_RELU);
    let mut module = load(&path).unwrap();
    assert_eq!(module.instance().config().device, DeviceKind::VectorCpu);

    let x = input();
    let y = module.forward(&x).unwrap();
    assert_eq!(y.shape(), &[1, 5, 4, 4]);

    for c in 0..5 {
        for h in 0..4 {
            for w in 0..4 {
                let got = y.data()[(c * 4 + h) * 4 + w];
                let interior = c >= 2 && (1..3).contains(&h) && (1..3).contains(&w);
                let expected = if interior {
                    x.data()[((c - 2) * 2 + h - 1) * 2 + w - 1].max(0.0)
                } else {
                    0.5
                };
                assert_eq!(got, expected, "c={c} h={h} w={w}");
            }
        }
    }
    std::fs::remove_file(path).ok();
}

#[test]
fn test_device_override_gives_same_result() {
    let path = write_descriptor("override", PAD_RELU);
    let mut vector = load(&path).unwrap();
    let mut naive = load_with_config(&path, NetworkConfig::default().with_device(DeviceKind::Naive)).unwrap();
    assert_eq!(naive.instance().reformat_count(), 0);
    assert!(vector.instance().reformat_count() > 0);

    let x = input();
    assert_eq!(vector.forward(&x).unwrap(), naive.forward(&x).unwrap());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_lower_rank_host_array() {
    let path = write_descriptor("rank3", PAD_RELU);
    let mut module = load(&path).unwrap();
    let x = HostArray::new(&[3, 2, 2], input().into_data()).unwrap();
    let y = module.forward(&x).unwrap();
    assert_eq!(y.shape(), &[1, 5, 4, 4]);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_errors() {
    let err = load("/nonexistent/brisk/model.json").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);

    let path = write_descriptor("broken", "{ \"inputs\": [] ");
    let err = load(&path).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Model);
    std::fs::remove_file(path).ok();

    let bad_pads = PAD_RELU.replace("[0, 2, 1, 1, 0, 0, 1, 1]", "[0, 2, 1, 1, 0, 0, 1]");
    let path = write_descriptor("bad-pads", &bad_pads);
    let err = load(&path).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Parameter);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_unsupported_device_in_descriptor() {
    let text = PAD_RELU.replace("vector_cpu", "npu");
    let path = write_descriptor("npu", &text);
    let err = load(&path).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
    std::fs::remove_file(path).ok();
}
