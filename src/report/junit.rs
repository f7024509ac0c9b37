use super::types::{CaseReport, RunReport};
use crate::engine::state::CaseResult;
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML from a run report. One `<testcase>` per catalog
/// entry; logical failures map to `<failure>`, transport errors to
/// `<error>`, never-run cases to `<skipped>`.
pub fn generate_junit_xml(report: &RunReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total = report.cases.len();
    let failures = report
        .cases
        .iter()
        .filter(|c| matches!(c.result, Some(CaseResult::Complete { passed: false, .. })))
        .count();
    let errors = report
        .cases
        .iter()
        .filter(|c| matches!(c.result, Some(CaseResult::Error { .. })))
        .count();
    let skipped = report.cases.iter().filter(|c| c.result.is_none()).count();
    let total_duration: u64 = report
        .cases
        .iter()
        .filter_map(|c| match c.result {
            Some(CaseResult::Complete { duration_ms, .. })
            | Some(CaseResult::Error { duration_ms, .. }) => Some(duration_ms),
            _ => None,
        })
        .sum();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "pi-harness-run"));
    suites_start.push_attribute(("tests", total.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    suites_start.push_attribute(("errors", errors.to_string().as_str()));
    suites_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        (total_duration as f64 / 1000.0).to_string().as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    // Single <testsuite> per run; grouping beyond category is not needed
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", "payment-instructions"));
    suite_start.push_attribute(("tests", total.to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("errors", errors.to_string().as_str()));
    suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suite_start.push_attribute(("id", report.session_id.as_str()));
    suite_start.push_attribute(("timestamp", report.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for case in &report.cases {
        write_test_case(&mut writer, case)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, case: &CaseReport) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", case.name.as_str()));
    case_start.push_attribute(("classname", case.category.as_str()));

    let duration_ms = match case.result {
        Some(CaseResult::Complete { duration_ms, .. })
        | Some(CaseResult::Error { duration_ms, .. }) => duration_ms,
        _ => 0,
    };
    case_start.push_attribute(("time", (duration_ms as f64 / 1000.0).to_string().as_str()));

    writer.write_event(Event::Start(case_start))?;

    match &case.result {
        Some(CaseResult::Complete {
            passed: false,
            status_code,
            response,
            ..
        }) => {
            let received_code = response
                .get("status_code")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("N/A");
            let message = format!(
                "expected {} {}, got {} {}",
                case.expected_status, case.expected_code, status_code, received_code
            );

            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message.as_str()));
            fail_start.push_attribute(("type", "ConformanceMismatch"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(&response.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        Some(CaseResult::Error { message, .. }) => {
            let mut err_start = BytesStart::new("error");
            err_start.push_attribute(("message", message.as_str()));
            err_start.push_attribute(("type", "TransportFailure"));
            writer.write_event(Event::Start(err_start))?;
            writer.write_event(Event::End(BytesEnd::new("error")))?;
        }
        None | Some(CaseResult::Running) => {
            writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
        }
        Some(CaseResult::Complete { passed: true, .. }) => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Render a JUnit report to a file or stdout
pub fn generate(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }
    Ok(())
}

/// Write `junit.xml` into the output directory
pub fn write_report(report: &RunReport, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}
