use std::process::{Command, Output};

fn run_simulation(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_traffic_signal_sim"))
        .args(args)
        .env("RUST_LOG", "warn,traffic_signal_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

fn stat_value(stderr: &str, label: &str) -> u64 {
    let line = stderr
        .lines()
        .find(|line| line.contains(label))
        .unwrap_or_else(|| panic!("Could not find '{label}' line"));
    // Format: "[2026-01-01T00:00:00Z INFO  traffic_signal_sim] Total ticks: 1200"
    let parts: Vec<&str> = line.split(label).collect();
    parts
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(|| panic!("Could not parse value from line: {line}"))
}

/// Test that the simulation runs headless without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_simulation(&["--fast", "--ticks", "1200", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("=== Intersection Summary ==="),
        "Missing final summary"
    );
}

/// Test that run statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_simulation(&[
        "--fast",
        "--ticks",
        "1200",
        "--seed",
        "7",
        "--emergency-every",
        "300",
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for label in [
        "Elapsed time:",
        "Vehicles processed:",
        "Active vehicles:",
        "Frames delivered:",
    ] {
        assert!(stderr.contains(label), "Missing '{label}' statistic");
    }

    assert_eq!(stat_value(&stderr, "Total ticks:"), 1200);
    assert!(
        stat_value(&stderr, "Emergency vehicles injected:") > 0,
        "No emergency vehicles were injected"
    );
    assert!(
        stderr.contains("Emergency mode on"),
        "Emergency preemption never engaged"
    );
}

/// Test that JSON reporting produces one parseable snapshot per report
#[test]
fn test_json_dashboard_output() {
    let output = run_simulation(&[
        "--fast",
        "--ticks",
        "600",
        "--seed",
        "3",
        "--json",
        "--report-every",
        "60",
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let snapshots: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect();

    assert_eq!(snapshots.len(), 10);
    assert_eq!(snapshots[0]["tick"], 60);
    assert_eq!(snapshots[9]["tick"], 600);
    for snapshot in &snapshots {
        let phase = snapshot["current_signal_phase"].as_str().unwrap();
        assert!(phase == "horizontal" || phase == "vertical");
        assert_eq!(snapshot["traffic_lights"].as_array().unwrap().len(), 4);
    }
}

/// Test that an invalid configuration is rejected
#[test]
fn test_invalid_configuration_fails() {
    let output = run_simulation(&["--fast", "--ticks", "10", "--spawn-probability", "2"]);
    assert!(!output.status.success(), "Invalid spawn probability accepted");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("spawn_probability"),
        "Error does not name the bad setting. stderr: {}",
        stderr
    );
}

/// Test that an interrupt stops a long run early and still reports
#[cfg(unix)]
#[test]
fn test_interrupt_stops_the_run() {
    use std::process::Stdio;
    use std::thread;
    use std::time::{Duration, Instant};

    let mut child = Command::new(env!("CARGO_BIN_EXE_traffic_signal_sim"))
        .args(["--ticks", "100000000", "--seed", "7"])
        .env("RUST_LOG", "warn,traffic_signal_sim=info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start simulation");

    thread::sleep(Duration::from_secs(1));
    let status = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .expect("Failed to send interrupt");
    assert!(status.success(), "kill -INT failed");

    let deadline = Instant::now() + Duration::from_secs(20);
    while child.try_wait().expect("Failed to poll simulation").is_none() {
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("Simulation ignored the interrupt");
        }
        thread::sleep(Duration::from_millis(50));
    }

    let output = child.wait_with_output().expect("Failed to collect output");
    assert!(output.status.success(), "Interrupted run exited with an error");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "No completion report after interrupt. stderr: {}",
        stderr
    );
    let ticks = stat_value(&stderr, "Total ticks:");
    assert!(ticks > 0 && ticks < 100_000_000, "unexpected tick count {ticks}");
}
