#![cfg(feature = "std")]

use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::ReaderBuilder;
use fluxcell::{
    bitcell_ticks,
    convert::{self, Outputs},
    log::CsvLog,
    samples,
};

/// A fresh scratch directory for one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fluxcell-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn read_log(path: impl AsRef<Path>) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = ReaderBuilder::new().from_path(path).unwrap();

    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();

    (headers, rows)
}

#[test]
fn bitcell_ticks_at_common_rates() {
    assert_eq!(bitcell_ticks(250), 144);
    assert_eq!(bitcell_ticks(300), 120);
    assert_eq!(bitcell_ticks(500), 72);
    assert_eq!(bitcell_ticks(0), 36000);
    assert_eq!(bitcell_ticks(u16::MAX), 1);
}

#[test]
fn samples_are_little_endian() {
    assert_eq!(samples::from_le_bytes(&[0x34, 0x12, 0xcd, 0xab, 0xff]), [0x1234, 0xabcd]);
    assert_eq!(samples::to_le_bytes(&[0x1234]), [0x34, 0x12]);

    assert!(samples::from_le_bytes(&[]).is_empty());
    assert!(samples::from_le_bytes(&[0x34]).is_empty());
}

#[test]
fn output_names() {
    let outputs = Outputs::new(
        Path::new("captures/track00.ff_samples"),
        Path::new("out"),
        500,
        "nco_v1[p_mul=1]",
    );

    assert_eq!(outputs.image, Path::new("out/track00.500_nco_v1[p_mul=1].hfe"));
    assert_eq!(outputs.data_log, Path::new("out/track00.500_nco_v1[p_mul=1].csv"));

    let outputs = Outputs::new(Path::new("track00.raw"), Path::new("out"), 250, "fdc9216");
    assert_eq!(outputs.image, Path::new("out/track00.raw.250_fdc9216.hfe"));
}

#[test]
fn csv_log_rows() {
    let config = "flashfloppy_v341".parse().unwrap();
    let mut log = CsvLog::new(Vec::new()).unwrap();

    let image = convert::convert(&config, 500, &[72, 144, 252], &mut log).unwrap();
    assert!(image.is_some());

    let data = log.finish().unwrap();
    let mut reader = ReaderBuilder::new().from_reader(data.as_slice());

    let headers = reader.headers().unwrap().iter().collect::<Vec<_>>();
    assert_eq!(headers, ["Timestamp", "Phase Error"]);

    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    assert_eq!(
        rows,
        [
            ["0.000000", "0"],
            ["72.000000", "0"],
            ["180.000000", "36"],
        ]
    );
}

#[test]
fn convert_file_writes_image_and_log() {
    let dir = scratch("convert");
    let input = dir.join("track.ff_samples");

    let flux = (1..=100u16).map(|i| i * 72).collect::<Vec<_>>();
    fs::write(&input, samples::to_le_bytes(&flux)).unwrap();

    let algorithm = "bitcell_width_pi_v2[p_mul=1,p_div=8,i_mul=1,i_div=256]";
    let image = convert::convert_file(&input, &dir, 500, algorithm, true)
        .unwrap()
        .unwrap();

    assert_eq!(image, dir.join(format!("track.500_{algorithm}.hfe")));

    let data = fs::read(&image).unwrap();
    assert_eq!(&data[..8], b"HXCPICFE");
    assert_eq!(&data[12..14], &500u16.to_le_bytes());
    // 100 bits round up to four words.
    assert_eq!(&data[0x202..0x204], &[32, 0]);
    assert_eq!(data.len(), 0x410);

    let (headers, rows) = read_log(dir.join(format!("track.500_{algorithm}.csv")));
    assert_eq!(headers, ["Timestamp", "Phase Error"]);
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[1], ["0.000001", "0.000000"]);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn empty_run_writes_no_image() {
    let dir = scratch("empty");
    let input = dir.join("blank.ff_samples");
    fs::write(&input, b"").unwrap();

    let image = convert::convert_file(&input, &dir, 500, "fdc9216", false).unwrap();
    assert_eq!(image, None);
    assert!(!dir.join("blank.500_fdc9216.hfe").exists());

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn configuration_errors_write_nothing() {
    let dir = scratch("config");
    let input = dir.join("track.ff_samples");
    fs::write(&input, samples::to_le_bytes(&[72, 144])).unwrap();

    let result = convert::convert_file(&input, &dir, 500, "nco_v2[p_mul=1]", true);
    assert!(matches!(result, Err(convert::Error::Selection(_))));
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

    fs::remove_dir_all(dir).unwrap();
}
