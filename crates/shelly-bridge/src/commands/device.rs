//! Single-device command handlers.
//!
//! Every mutating command re-polls afterwards and prints the fresh report,
//! so the output always reflects what the device confirmed.

use serde::Serialize;
use shelly_api::{DeviceInfo, LedColor};
use shelly_core::{DeviceHandle, DeviceReport, DeviceState, NodeCommand};
use tabled::Tabled;

use crate::cli::{
    ColorArgs, DeviceArgs, EffectArgs, GlobalOpts, OnArgs, OutputFormat, TransitionArgs,
};
use crate::error::CliError;
use crate::output;

use super::util::resolve_device;

// ── Report rendering ─────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ReportRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "On")]
    on: String,
    #[tabled(rename = "RGBW")]
    color: String,
    #[tabled(rename = "Brightness")]
    brightness: String,
}

impl From<&DeviceReport> for ReportRow {
    fn from(r: &DeviceReport) -> Self {
        let (color, brightness) = match r.state {
            Some(DeviceState::Color(c)) => (
                format!("{},{},{},{}", c.red, c.green, c.blue, c.white),
                format!("{}%", c.brightness),
            ),
            _ => ("-".into(), "-".into()),
        };
        Self {
            device: r.device_id.clone(),
            kind: r.kind.to_string(),
            status: r.availability.to_string(),
            on: on_label(r),
            color,
            brightness,
        }
    }
}

/// Offline and degraded reports never claim "off".
fn on_label(report: &DeviceReport) -> String {
    match report.is_on() {
        Some(true) => "on".into(),
        Some(false) => "off".into(),
        None => "-".into(),
    }
}

fn report_detail(r: &DeviceReport) -> String {
    let mut pairs = vec![
        ("Device", r.device_id.clone()),
        ("Kind", r.kind.to_string()),
        ("Status", r.availability.to_string()),
        ("On", on_label(r)),
    ];
    if let Some(DeviceState::Color(c)) = r.state {
        pairs.extend([
            ("Red", c.red.to_string()),
            ("Green", c.green.to_string()),
            ("Blue", c.blue.to_string()),
            ("White", c.white.to_string()),
            ("Brightness", format!("{}%", c.brightness)),
            ("Transition", format!("{}ms", c.transition_ms)),
            ("Effect", c.effect.to_string()),
        ]);
    }
    if let Some(ref error) = r.error {
        pairs.push(("Error", error.clone()));
    }
    pairs.push(("Polled", r.polled_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    output::detail_lines(&pairs)
}

/// Plain output is the host-facing attribute line.
fn report_attributes(r: &DeviceReport) -> String {
    r.attributes()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_report(report: &DeviceReport, format: OutputFormat) -> Result<String, CliError> {
    output::render_single(format, report, report_detail, report_attributes)
}

pub fn render_reports(reports: &[DeviceReport], format: OutputFormat) -> Result<String, CliError> {
    output::render_list(format, reports, |r| ReportRow::from(r), |r| {
        format!("{} {}", r.device_id, report_attributes(r))
    })
}

async fn poll_and_print(handle: &DeviceHandle, global: &GlobalOpts) -> Result<(), CliError> {
    let report = handle.poll().await;
    output::print_output(&render_report(&report, global.output)?);
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn status(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(args, global)?;
    poll_and_print(&handle, global).await
}

pub async fn on(args: &OnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(&args.target, global)?;
    match args.timer {
        Some(seconds) => {
            handle.profile().turn_on(Some(seconds)).await?;
            poll_and_print(&handle, global).await
        }
        None => execute(&handle, &NodeCommand::TurnOn, global).await,
    }
}

pub async fn off(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(args, global)?;
    execute(&handle, &NodeCommand::TurnOff, global).await
}

pub async fn toggle(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(args, global)?;
    handle.profile().toggle().await?;
    poll_and_print(&handle, global).await
}

pub async fn color(args: &ColorArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = LedColor {
        red: args.red,
        green: args.green,
        blue: args.blue,
        white: args.white,
        brightness: args.brightness,
        on: match (args.on, args.off) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
        timer: args.timer,
    };
    if color.is_empty() {
        return Err(CliError::Validation {
            field: "color".into(),
            reason: "set at least one of --red, --green, --blue, --white, --brightness".into(),
        });
    }

    let handle = resolve_device(&args.target, global)?;
    execute(&handle, &NodeCommand::SetAllColor(color), global).await
}

pub async fn effect(args: &EffectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(&args.target, global)?;
    execute(&handle, &NodeCommand::SetEffect(args.effect), global).await
}

pub async fn transition(args: &TransitionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(&args.target, global)?;
    if args.one_shot {
        handle
            .profile()
            .as_color("transition")?
            .set_one_shot_transition(args.milliseconds)
            .await?;
        poll_and_print(&handle, global).await
    } else {
        execute(&handle, &NodeCommand::SetTransition(args.milliseconds), global).await
    }
}

#[derive(Serialize)]
struct Ack<'a> {
    device: &'a str,
    action: &'static str,
}

pub async fn reboot(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(args, global)?;
    handle.profile().connector().reboot().await?;

    let ack = Ack {
        device: handle.id(),
        action: "reboot",
    };
    let out = output::render_single(
        global.output,
        &ack,
        |a| format!("Reboot requested for {}", a.device),
        |a| a.device.to_owned(),
    )?;
    output::print_output(&out);
    Ok(())
}

pub async fn info(args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let handle = resolve_device(args, global)?;
    let info = handle.profile().connector().get_device_info().await?;

    let out = output::render_single(global.output, &info, info_detail, |i| {
        i.mac.clone().unwrap_or_default()
    })?;
    output::print_output(&out);
    Ok(())
}

fn info_detail(i: &DeviceInfo) -> String {
    let show = |v: Option<&str>| v.unwrap_or("-").to_owned();
    output::detail_lines(&[
        ("Type", show(i.device_type.as_deref())),
        ("MAC", show(i.mac.as_deref())),
        ("Firmware", show(i.fw.as_deref())),
        (
            "Auth",
            match i.auth {
                Some(true) => "required".to_owned(),
                Some(false) => "open".to_owned(),
                None => "-".to_owned(),
            },
        ),
        (
            "Outputs",
            i.num_outputs.map_or_else(|| "-".to_owned(), |n| n.to_string()),
        ),
    ])
}

async fn execute(
    handle: &DeviceHandle,
    command: &NodeCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = handle.execute(command).await?;
    output::print_output(&render_report(&report, global.output)?);
    Ok(())
}
