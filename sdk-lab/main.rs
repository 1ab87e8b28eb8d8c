//! flagcast SDK Lab
//!
//! Internal verification script for adapter and broadcast behavior.
//! Run with: cargo run --example sdk-lab

use flagcast::{
    is_feature_enabled, select_flag, Adapter, AdapterConfiguration, AdapterPhase,
    BroadcastChannel, FlagValue, MemoryService, PartialConfiguration, SubscriberBinding, User,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PASS: &str = "\x1b[32m[PASS]\x1b[0m";
const FAIL: &str = "\x1b[31m[FAIL]\x1b[0m";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== flagcast SDK Lab ===\n");

    let mut passed = 0;
    let mut failed = 0;

    macro_rules! pass {
        ($test:expr) => {{
            println!("{} {}", PASS, $test);
            passed += 1;
        }};
    }

    macro_rules! fail {
        ($test:expr) => {{
            println!("{} {}", FAIL, $test);
            failed += 1;
        }};
    }

    // Test 1: Lifecycle guard before configure
    println!("Testing lifecycle...");
    let service = MemoryService::with_treatments([
        ("lab-bool", serde_json::json!("on")),
        ("lab-string", serde_json::json!("Hello Lab")),
        ("lab-number", serde_json::json!(42.0)),
        ("lab-off", serde_json::json!("off")),
    ]);
    let adapter = Adapter::new(service.clone());

    match adapter
        .reconfigure(PartialConfiguration::with_user(User::with_key("early")))
        .await
    {
        Err(e) if e.is_not_configured() => pass!("Reconfigure before configure rejected"),
        other => fail!(format!("Reconfigure before configure - {:?}", other.err())),
    }

    // Test 2: Channel and bindings attached before configure
    let channel = BroadcastChannel::new();
    adapter.attach_channel(&channel);

    let bool_changes = Arc::new(AtomicUsize::new(0));
    let bool_changes_clone = Arc::clone(&bool_changes);
    let lab_bool = SubscriberBinding::attach(&channel, is_feature_enabled("lab-bool"), move |_| {
        bool_changes_clone.fetch_add(1, Ordering::SeqCst);
    });
    let lab_string = SubscriberBinding::attach(&channel, select_flag("lab-string"), |_| {});

    // Test 3: Configure with anonymous user
    let configuration = AdapterConfiguration::builder("lab-authorization-key")
        .user(User::new().attribute("group", "lab"))
        .ready_timeout(Duration::from_secs(3))
        .build();

    match adapter.configure(configuration).await {
        Ok(()) => pass!("Configure"),
        Err(e) => {
            fail!(format!("Configure - {}", e));
            print_summary(passed, failed);
            std::process::exit(1);
        }
    }

    if adapter.phase() == AdapterPhase::Ready && adapter.status().is_ready {
        pass!("Adapter ready");
    } else {
        fail!(format!("Adapter ready - phase {:?}", adapter.phase()));
    }

    match service.connections().first() {
        Some(settings) if !settings.key.is_empty() => {
            pass!(format!("Anonymous key assigned ({})", settings.key))
        }
        _ => fail!("Anonymous key assigned"),
    }

    // Test 4: Normalized flags
    println!("\nTesting normalization...");
    let flags = adapter.flags();
    if flags.get("labBool") == Some(&FlagValue::Bool(true)) {
        pass!("\"on\" treatment normalized to true");
    } else {
        fail!(format!("\"on\" treatment - {:?}", flags.get("labBool")));
    }
    if flags.get("labOff") == Some(&FlagValue::Bool(false)) {
        pass!("\"off\" treatment normalized to false");
    } else {
        fail!(format!("\"off\" treatment - {:?}", flags.get("labOff")));
    }
    if flags.get("labNumber") == Some(&FlagValue::Number(42.0)) {
        pass!("Number treatment passed through");
    } else {
        fail!(format!("Number treatment - {:?}", flags.get("labNumber")));
    }

    // Test 5: Broadcast bindings
    println!("\nTesting broadcast...");
    if lab_bool.current() {
        pass!("Binding received flag");
    } else {
        fail!("Binding received flag");
    }
    if lab_string.current() == Some(FlagValue::from("Hello Lab")) {
        pass!("String binding received flag");
    } else {
        fail!(format!("String binding - {:?}", lab_string.current()));
    }

    let before = bool_changes.load(Ordering::SeqCst);
    service.set_treatment("lab-string", "Updated Lab");
    tokio::time::sleep(Duration::from_millis(50)).await;

    if lab_string.current() == Some(FlagValue::from("Updated Lab")) {
        pass!("Service update propagated");
    } else {
        fail!(format!("Service update - {:?}", lab_string.current()));
    }
    if bool_changes.load(Ordering::SeqCst) == before {
        pass!("Unrelated binding not notified");
    } else {
        fail!("Unrelated binding not notified");
    }

    // Test 6: Reconfigure
    println!("\nTesting reconfigure...");
    service.set_user_treatment("lab-user", "lab-bool", "off");
    match adapter
        .reconfigure(PartialConfiguration::with_user(User::with_key("lab-user")))
        .await
    {
        Ok(()) => pass!("Reconfigure"),
        Err(e) => fail!(format!("Reconfigure - {}", e)),
    }
    if !lab_bool.current() {
        pass!("Reconfigured user flags broadcast");
    } else {
        fail!("Reconfigured user flags broadcast");
    }

    // Test 7: Detach
    let subscribers = channel.subscriber_count();
    lab_bool.detach();
    if channel.subscriber_count() == subscribers - 1 {
        pass!("Binding detached");
    } else {
        fail!("Binding detached");
    }

    print_summary(passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_summary(passed: i32, failed: i32) {
    println!("\n============================================================");
    println!("Summary: {} passed, {} failed", passed, failed);
    println!("============================================================");
}
