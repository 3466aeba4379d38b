//! Integration test cases.

use std::time::Duration;

use colored::Colorize;

use eggplot_host::port::{NativePort, Port};
use eggplot_host::protocol::{self, PenState, Point, Request};
use eggplot_host::{wire, Error, Session};

/// Test result.
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn pass() -> Self {
        Self {
            name: String::new(),
            passed: true,
            message: None,
        }
    }

    fn fail(message: &str) -> Self {
        Self {
            name: String::new(),
            passed: false,
            message: Some(message.to_string()),
        }
    }
}

/// Run a test function and print results as it happens.
fn run_test<F>(name: &str, session: &mut Session<NativePort>, test_fn: F) -> TestResult
where
    F: FnOnce(&mut Session<NativePort>) -> TestResult,
{
    print!("  {} ... ", name);
    std::io::Write::flush(&mut std::io::stdout()).ok();

    let mut result = test_fn(session);
    result.name = name.to_string();

    if result.passed {
        println!("{}", "PASS".green().bold());
    } else {
        println!("{}", "FAIL".red().bold());
        if let Some(msg) = &result.message {
            println!("    {}", msg.red());
        }
    }

    result
}

/// Run all tests and return results.
pub fn run_all_tests(session: &mut Session<NativePort>) -> Vec<TestResult> {
    let mut results = Vec::new();

    results.push(run_test("Handshake reports a current version", session, test_handshake));
    results.push(run_test("Begin and End are acknowledged", session, test_begin_end));
    results.push(run_test("Pen echoes the applied state", session, test_pen_roundtrip));
    results.push(run_test("Dot is acknowledged", session, test_dot));
    results.push(run_test("Move acknowledges the point count", session, test_move_count));
    results.push(run_test("Line is acknowledged", session, test_line));
    results.push(run_test("Corrupted checksum is rejected", session, test_corrupted_checksum));
    results.push(run_test("Half a sync preamble stays silent", session, test_sync_loss));

    results
}

/// Print test results summary.
pub fn print_results(results: &[TestResult]) {
    println!("\n{}", "=".repeat(60));
    println!("{}", "Test Results".bold());
    println!("{}", "=".repeat(60));

    let mut passed = 0;
    let mut failed = 0;

    for result in results {
        if result.passed {
            println!("  {} {}", "[PASS]".green().bold(), result.name);
            passed += 1;
        } else {
            println!("  {} {}", "[FAIL]".red().bold(), result.name);
            if let Some(msg) = &result.message {
                println!("         {}", msg.red());
            }
            failed += 1;
        }
    }

    println!("{}", "=".repeat(60));
    println!("  {passed} passed, {failed} failed");
}

fn test_handshake(session: &mut Session<NativePort>) -> TestResult {
    match session.handshake() {
        Ok((major, minor)) => {
            if (major, minor) >= (protocol::VERSION_MAJOR, protocol::VERSION_MINOR) {
                TestResult::pass()
            } else {
                TestResult::fail(&format!("listener is stale: {major}.{minor}"))
            }
        }
        Err(e) => TestResult::fail(&format!("handshake failed: {e}")),
    }
}

fn test_begin_end(session: &mut Session<NativePort>) -> TestResult {
    if let Err(e) = session.begin() {
        return TestResult::fail(&format!("begin failed: {e}"));
    }
    match session.end() {
        Ok(()) => TestResult::pass(),
        Err(e) => TestResult::fail(&format!("end failed: {e}")),
    }
}

fn test_pen_roundtrip(session: &mut Session<NativePort>) -> TestResult {
    match session.pen(PenState::Down) {
        Ok(PenState::Down) => {}
        Ok(state) => return TestResult::fail(&format!("asked for Down, got {state:?}")),
        Err(e) => return TestResult::fail(&format!("pen down failed: {e}")),
    }
    match session.pen(PenState::Up) {
        Ok(PenState::Up) => TestResult::pass(),
        Ok(state) => TestResult::fail(&format!("asked for Up, got {state:?}")),
        Err(e) => TestResult::fail(&format!("pen up failed: {e}")),
    }
}

fn test_dot(session: &mut Session<NativePort>) -> TestResult {
    match session.dot(Point::new(100, 50)) {
        Ok(()) => TestResult::pass(),
        Err(e) => TestResult::fail(&format!("dot failed: {e}")),
    }
}

fn test_move_count(session: &mut Session<NativePort>) -> TestResult {
    match session.move_points(&[Point::new(-1, 0), Point::new(0, 0)]) {
        Ok(2) => TestResult::pass(),
        Ok(count) => TestResult::fail(&format!("sent 2 points, listener walked {count}")),
        Err(e) => TestResult::fail(&format!("move failed: {e}")),
    }
}

fn test_line(session: &mut Session<NativePort>) -> TestResult {
    match session.line(Point::new(0, 0), Point::new(40, 10)) {
        Ok(()) => TestResult::pass(),
        Err(e) => TestResult::fail(&format!("line failed: {e}")),
    }
}

/// Flip the last complement byte of a pen frame; the listener must answer
/// with its error surface instead of an ack.
fn test_corrupted_checksum(session: &mut Session<NativePort>) -> TestResult {
    fn run(session: &mut Session<NativePort>) -> eggplot_host::Result<TestResult> {
        let request = Request::Pen(PenState::Down);
        let port = session.port_mut();

        port.clear_input()?;
        port.write_all(&protocol::SYNC)?;
        let mut ack = [0u8; 4];
        port.read_exact(&mut ack)?;
        if ack != protocol::SYNC_ACK {
            return Ok(TestResult::fail("no sync ack before the frame"));
        }

        port.write_all(&request.header())?;
        let mut echo = [0u8; 3];
        port.read_exact(&mut echo)?;
        if echo != request.header_echo() {
            return Ok(TestResult::fail("header echo mismatch"));
        }

        let mut body = request.body().to_vec();
        let last = body.len() - 1;
        body[last] ^= 0xFF;
        port.write_all(&body)?;
        port.write_all(&[protocol::ALL_WRITTEN])?;

        match wire::read_response(port, request.expected_ack()) {
            Err(Error::Endpoint) => Ok(TestResult::pass()),
            Err(other) => Ok(TestResult::fail(&format!(
                "expected the error surface, got: {other}"
            ))),
            Ok(response) => Ok(TestResult::fail(&format!(
                "listener accepted the corrupt frame: {response:?}"
            ))),
        }
    }

    run(session).unwrap_or_else(|e| TestResult::fail(&format!("wire error: {e}")))
}

/// Write half a sync preamble: the listener must block silently, and the
/// line must come back up once the preamble completes.
fn test_sync_loss(session: &mut Session<NativePort>) -> TestResult {
    fn run(session: &mut Session<NativePort>) -> eggplot_host::Result<TestResult> {
        let port = session.port_mut();

        port.clear_input()?;
        port.write_all(&protocol::SYNC[..2])?;
        let mut ack = [0u8; 4];
        match port.read_exact(&mut ack) {
            Err(Error::Timeout) => {}
            Err(e) => return Err(e),
            Ok(()) => {
                return Ok(TestResult::fail("listener answered a half preamble"));
            }
        }

        // Complete the preamble so the listener lines back up, then let its
        // header window lapse before talking again.
        port.write_all(&protocol::SYNC[2..])?;
        port.read_exact(&mut ack)?;
        if ack != protocol::SYNC_ACK {
            return Ok(TestResult::fail("listener lost sync alignment"));
        }
        std::thread::sleep(Duration::from_millis(600));

        match session.handshake() {
            Ok(_) => Ok(TestResult::pass()),
            Err(e) => Ok(TestResult::fail(&format!(
                "listener did not recover: {e}"
            ))),
        }
    }

    run(session).unwrap_or_else(|e| TestResult::fail(&format!("wire error: {e}")))
}
