use skiload_storage::{
    spawn_writer, telemetry_channel, CsvRecordWriter, StatisticsAnalyzer, StatsError,
};
use skiload_types::{RequestKind, RequestRecord, LIFT_RIDE_PATH, SKIER_DAY_VERTICAL_PATH};
use std::path::PathBuf;
use tempfile::TempDir;

const HEADER: &str = "RequestType,Path,StartTimestamp(ms),Latency(ms),ResponseCode\n";
const POST_KEY: &str = "POST /skiers/liftrides";
const GET_KEY: &str = "GET /skiers/{resortID}/days/{dayID}/skiers/{skierID}";

fn write_file(dir: &TempDir, rows: &[&str]) -> PathBuf {
    let path = dir.path().join("records.csv");
    let mut contents = String::from(HEADER);
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(&path, contents).expect("write records");
    path
}

fn post(start: i64, latency: u64) -> RequestRecord {
    RequestRecord::new(RequestKind::Write, LIFT_RIDE_PATH, start, latency, 201)
}

#[test]
fn median_and_p99_from_persisted_file() {
    let dir = TempDir::new().expect("temp dir");
    let rows: Vec<String> = [1, 1, 2, 3, 3, 3, 5]
        .iter()
        .enumerate()
        .map(|(i, latency)| format!("POST,/skiers/liftrides,{},{latency},201", 1_000 + i))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let path = write_file(&dir, &rows);

    let stats = StatisticsAnalyzer::new(&path).analyze(1_000, 2_000);

    assert_eq!(stats.median.as_ref().unwrap()[POST_KEY], 3);
    assert_eq!(stats.p99.as_ref().unwrap()[POST_KEY], 5);
    assert_eq!(stats.max.as_ref().unwrap()[POST_KEY], 5);
    assert_eq!(stats.requests_started_per_second.as_ref().unwrap(), &vec![7]);
    assert!(stats.errors().is_empty());
}

#[test]
fn keys_are_tracked_separately() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        &[
            "POST,/skiers/liftrides,100,10,201",
            "POST,/skiers/liftrides,110,30,201",
            "GET,/skiers/{resortID}/days/{dayID}/skiers/{skierID},120,4,200",
        ],
    );

    let stats = StatisticsAnalyzer::new(&path).analyze(100, 200);
    let endpoints = stats.endpoints();

    assert_eq!(endpoints.len(), 2);
    let get = endpoints.iter().find(|e| e.endpoint == GET_KEY).unwrap();
    assert_eq!(get.max_ms, Some(4));
    assert_eq!(get.median_ms, Some(4));
    let post = endpoints.iter().find(|e| e.endpoint == POST_KEY).unwrap();
    assert_eq!(post.mean_ms, Some(20.0));
    assert_eq!(post.max_ms, Some(30));
}

#[test]
fn written_records_read_back_with_same_mean() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("records.csv");
    let writer = CsvRecordWriter::create(&path).unwrap();
    let (tx, rx) = telemetry_channel();
    let handle = spawn_writer(writer, rx).unwrap();

    let latencies = [12u64, 7, 19, 3, 44, 8];
    tx.send(latencies.iter().map(|&l| post(5_000, l)).collect())
        .unwrap();
    tx.send(vec![RequestRecord::new(
        RequestKind::Read,
        SKIER_DAY_VERTICAL_PATH,
        5_001,
        9,
        404,
    )])
    .unwrap();
    tx.close().unwrap();
    assert_eq!(handle.join().unwrap().rows, 7);

    let stats = StatisticsAnalyzer::new(&path).analyze(5_000, 6_000);
    let expected = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
    let mean = stats.mean.as_ref().unwrap()[POST_KEY];
    assert!((mean - expected).abs() < 1e-9);
    assert_eq!(stats.mean.as_ref().unwrap()[GET_KEY], 9.0);
}

#[test]
fn request_start_lands_in_its_second() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        &[
            "POST,/skiers/liftrides,10000,5,201",
            "POST,/skiers/liftrides,11500,5,201",
            "POST,/skiers/liftrides,12999,5,201",
        ],
    );

    let histogram = StatisticsAnalyzer::new(&path)
        .reader()
        .requests_started_per_second(10_000, 13_000)
        .unwrap();
    assert_eq!(histogram, vec![1, 1, 1]);

    let partial = StatisticsAnalyzer::new(&path)
        .reader()
        .requests_started_per_second(10_000, 11_900)
        .unwrap_err();
    assert!(matches!(partial, StatsError::BucketOutOfRange { buckets: 2, .. }));
}

#[test]
fn request_before_wall_start_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, &["POST,/skiers/liftrides,9999,5,201"]);

    let stats = StatisticsAnalyzer::new(&path).analyze(10_000, 11_000);
    assert!(matches!(
        stats.requests_started_per_second,
        Err(StatsError::BucketOutOfRange { start_time_ms: 9_999, .. })
    ));
    assert!(stats.mean.is_ok());
    assert!(stats.median.is_ok());
}

#[test]
fn malformed_latency_fails_only_latency_computations() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        &[
            "POST,/skiers/liftrides,1000,12,201",
            "POST,/skiers/liftrides,1001,oops,201",
        ],
    );

    let stats = StatisticsAnalyzer::new(&path).analyze(1_000, 2_000);

    assert!(matches!(
        stats.mean,
        Err(StatsError::MalformedField { column: "Latency(ms)", line: 3, .. })
    ));
    assert!(matches!(stats.max, Err(StatsError::MalformedField { .. })));
    assert!(matches!(stats.median, Err(StatsError::MaxUnavailable(_))));
    assert!(matches!(stats.p99, Err(StatsError::MaxUnavailable(_))));
    assert_eq!(stats.requests_started_per_second.as_ref().unwrap(), &vec![2]);
    assert_eq!(stats.errors().len(), 4);
    assert!(stats.endpoints().is_empty());
}

#[test]
fn malformed_start_time_fails_only_the_histogram() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        &[
            "POST,/skiers/liftrides,1000,12,201",
            "POST,/skiers/liftrides,soon,8,201",
        ],
    );

    let stats = StatisticsAnalyzer::new(&path).analyze(1_000, 2_000);

    assert!(matches!(
        stats.requests_started_per_second,
        Err(StatsError::MalformedField { column: "StartTimestamp(ms)", .. })
    ));
    assert_eq!(stats.mean.as_ref().unwrap()[POST_KEY], 10.0);
    assert_eq!(stats.max.as_ref().unwrap()[POST_KEY], 12);
    assert_eq!(stats.median.as_ref().unwrap()[POST_KEY], 8);
    assert_eq!(stats.p99.as_ref().unwrap()[POST_KEY], 12);
    assert_eq!(stats.errors().len(), 1);
}

#[test]
fn unused_response_code_column_is_not_parsed() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        &[
            "POST,/skiers/liftrides,1000,4,201",
            "POST,/skiers/liftrides,1001,8,xyz",
        ],
    );

    let stats = StatisticsAnalyzer::new(&path).analyze(1_000, 2_000);

    assert!(stats.errors().is_empty());
    assert_eq!(stats.mean.as_ref().unwrap()[POST_KEY], 6.0);
    assert_eq!(stats.requests_started_per_second.as_ref().unwrap(), &vec![2]);
}

#[test]
fn missing_file_is_an_error_not_a_panic() {
    let dir = TempDir::new().expect("temp dir");
    let stats = StatisticsAnalyzer::new(dir.path().join("absent.csv")).analyze(0, 1_000);
    assert_eq!(stats.errors().len(), 5);
}
