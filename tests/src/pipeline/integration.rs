#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use probr_core::exporter;
use probr_core::scheduler::Scheduler;

use crate::support::{ScanStep, ScriptedScanner};

const SSH_HOST: &str = r#"
    <nmaprun scanner="nmap" version="7.95">
        <host>
            <status state="up" reason="syn-ack"/>
            <address addr="10.0.0.5" addrtype="ipv4"/>
            <times srtt="2500"/>
            <ports>
                <port protocol="tcp" portid="22">
                    <state state="open"/>
                    <service name="ssh"/>
                </port>
                <port protocol="tcp" portid="80">
                    <state state="closed"/>
                </port>
            </ports>
        </host>
    </nmaprun>"#;

const OTHER_HOST: &str = r#"
    <nmaprun>
        <host>
            <status state="up"/>
            <address addr="10.0.0.6" addrtype="ipv4"/>
        </host>
    </nmaprun>"#;

fn scheduler_with(scanner: Arc<ScriptedScanner>, timeout: Duration) -> Arc<Scheduler> {
    Arc::new(Scheduler::new(
        scanner,
        vec!["10.0.0.5".parse().unwrap()],
        timeout,
    ))
}

/// Full pipeline: fake scan reports host up with port 22 open (ssh) and
/// port 80 closed. The render must carry an open sample with value 1 and,
/// per the explicit-closed emission policy, a closed sample with value 0.
#[tokio::test]
async fn scan_results_surface_in_rendered_metrics() {
    let scanner = Arc::new(ScriptedScanner::new(vec![ScanStep::Xml(SSH_HOST)]));
    let scheduler = scheduler_with(scanner, Duration::from_secs(5));

    scheduler.tick().await;

    let (snapshot, stats) = scheduler.observe();
    let text = exporter::render(&snapshot, &stats, "dmz");

    assert!(text.contains(
        "nmap_port_state{address=\"10.0.0.5\",hostname=\"10.0.0.5\",group=\"dmz\",\
         proto=\"tcp\",port=\"22\",service=\"ssh\",state=\"open\"} 1"
    ));
    assert!(text.contains(
        "nmap_port_state{address=\"10.0.0.5\",hostname=\"10.0.0.5\",group=\"dmz\",\
         proto=\"tcp\",port=\"80\",service=\"unknown\",state=\"closed\"} 0"
    ));
    assert!(text.contains("nmap_host_up{address=\"10.0.0.5\",hostname=\"10.0.0.5\",group=\"dmz\"} 1"));
    assert!(text.contains("nmap_scan_success 1"));
}

/// A hung scanner run ends as a timeout: the previous snapshot keeps being
/// served unchanged and only the timeout failure counter moves.
#[tokio::test]
async fn hung_scan_times_out_without_touching_the_snapshot() {
    let scanner = Arc::new(ScriptedScanner::new(vec![
        ScanStep::Xml(SSH_HOST),
        ScanStep::Hang,
    ]));
    let scheduler = scheduler_with(scanner, Duration::from_millis(50));

    scheduler.tick().await;
    let before = scheduler.snapshot();

    scheduler.tick().await;

    let (after, stats) = scheduler.observe();
    assert!(
        Arc::ptr_eq(&before, &after),
        "failed attempt must not replace the snapshot"
    );
    assert_eq!(stats.timeout_failures, 1);

    let text = exporter::render(&after, &stats, "");
    assert!(text.contains("nmap_scan_failures_total{kind=\"timeout\"} 1"));
    assert!(text.contains("nmap_scan_success 0"));
    // The previous scan's data is still served.
    assert!(text.contains("nmap_host_up{address=\"10.0.0.5\",hostname=\"10.0.0.5\",group=\"\"} 1"));
}

/// Readers racing an in-progress scan all see the same pre-scan snapshot;
/// no render ever mixes two scans.
#[tokio::test]
async fn concurrent_renders_during_a_scan_are_identical() {
    let scanner = Arc::new(ScriptedScanner::new(vec![
        ScanStep::Xml(SSH_HOST),
        ScanStep::Delayed(OTHER_HOST, Duration::from_millis(500)),
    ]));
    let scheduler = scheduler_with(scanner, Duration::from_secs(5));

    scheduler.tick().await;
    let (snapshot, stats) = scheduler.observe();
    let baseline = exporter::render(&snapshot, &stats, "");

    let slow_tick = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.tick().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut readers = Vec::new();
    for _ in 0..8 {
        let scheduler = scheduler.clone();
        readers.push(tokio::spawn(async move {
            let (snapshot, stats) = scheduler.observe();
            exporter::render(&snapshot, &stats, "")
        }));
    }

    for reader in readers {
        let text = reader.await.unwrap();
        assert_eq!(text, baseline, "render must match the pre-scan snapshot");
    }

    slow_tick.await.unwrap();
    let (snapshot, stats) = scheduler.observe();
    let text = exporter::render(&snapshot, &stats, "");
    assert!(text.contains("nmap_host_up{address=\"10.0.0.6\",hostname=\"10.0.0.6\",group=\"\"} 1"));
}

/// Ticks that arrive while a scan is running never start a second scanner
/// invocation, end to end.
#[tokio::test]
async fn overlapping_ticks_run_one_scan() {
    let scanner = Arc::new(ScriptedScanner::new(vec![ScanStep::Delayed(
        SSH_HOST,
        Duration::from_millis(200),
    )]));
    let scheduler = scheduler_with(scanner.clone(), Duration::from_secs(5));

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.tick().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    scheduler.tick().await;
    scheduler.tick().await;
    running.await.unwrap();

    assert_eq!(scanner.call_count(), 1);
}

/// Sustained failures never take the endpoint data away: the last good
/// snapshot keeps rendering while failure counters climb.
#[tokio::test]
async fn repeated_failures_keep_serving_the_last_good_snapshot() {
    let scanner = Arc::new(ScriptedScanner::new(vec![
        ScanStep::Xml(SSH_HOST),
        ScanStep::Hang,
    ]));
    let scheduler = scheduler_with(scanner, Duration::from_millis(20));

    scheduler.tick().await;
    for _ in 0..3 {
        scheduler.tick().await;
    }

    let (snapshot, stats) = scheduler.observe();
    assert_eq!(stats.timeout_failures, 3);
    assert_eq!(stats.success_total, 1);

    let text = exporter::render(&snapshot, &stats, "");
    assert!(text.contains("nmap_host_up{address=\"10.0.0.5\",hostname=\"10.0.0.5\",group=\"\"} 1"));
    assert!(text.contains("nmap_scan_failures_total{kind=\"timeout\"} 3"));
}
