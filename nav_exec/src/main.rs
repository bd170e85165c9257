//! Main navigation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Motor controller telemetry acquisition
//!         - Telecommand processing and handling
//!         - Pose acquisition
//!         - Robot and navigation control processing
//!         - Audio output processing
//!         - Motor link processing
//!         - Telemetry
//!
//! Running with `--sim` replaces the motor controller and tracking sensor with the simulated
//! robot.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::{eqpt::drive::DriveCmd, net::NetParams};
use nav_lib::{
    audio::{AudioMonitor, CuePlayer, MicGate},
    data_store::DataStore,
    events::EventBroker,
    loc::{PoseClient, PoseSource},
    locations::{LocationRegistry, LocationsParams},
    motor_link::{MotorLink, MotorLinkParams},
    nav::{NavCtrl, NavCtrlParams},
    params::NavExecParams,
    path_planner::DirectPlanner,
    robot_ctrl::RobotCtrl,
    sim::{SimParams, SimRobot},
    tc_client::TcClient,
    tc_processor,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    logger::{logger_init, parse_module_levels, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec", about = "Indoor robot navigation executable")]
struct Opt {
    /// Run the given TC script rather than recieving TCs from the ground
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Use the simulated robot, overrides the `use_sim` parameter
    #[structopt(long)]
    sim: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    Remote(TcClient),
    Script(ScriptInterpreter),
}

/// Where the robot's pose comes from.
enum PoseInput {
    Tracker(PoseClient),
    Sim(SimRobot),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let exec_params: NavExecParams =
        util::params::load("nav_exec.toml").wrap_err("Could not load exec params")?;

    // Initialise session
    let session = Session::new("nav_exec", &exec_params.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    let module_levels = parse_module_levels(&exec_params.module_log_levels)
        .wrap_err("Invalid module log levels")?;
    logger_init(LevelFilter::Trace, &module_levels, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Indoor Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let motor_link_params: MotorLinkParams =
        util::params::load("motor_link.toml").wrap_err("Could not load motor link params")?;
    let nav_ctrl_params: NavCtrlParams =
        util::params::load("nav_ctrl.toml").wrap_err("Could not load nav ctrl params")?;
    let locations_params: LocationsParams =
        util::params::load("locations.toml").wrap_err("Could not load locations")?;

    let use_sim = opt.sim || exec_params.use_sim;
    let sim_params: SimParams = if use_sim {
        util::params::load("sim.toml").wrap_err("Could not load sim params")?
    } else {
        SimParams::default()
    };

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, remote control via the TcClient will be used\n");

            let c = TcClient::new(&net_params).wrap_err("Failed to initialise the TcClient")?;
            info!("TcClient listening on {:?}", c.local_addr());
            TcSource::Remote(c)
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    let broker = Arc::new(
        EventBroker::with_default_events().wrap_err("Failed to initialise the event broker")?,
    );

    let mut cue_player = CuePlayer::new(&broker, exec_params.cue_duration_s)
        .wrap_err("Failed to initialise the audio output")?;
    let mut mic_gate = MicGate::new(&broker).wrap_err("Failed to initialise the mic gate")?;
    let mut audio_monitor = AudioMonitor::new();

    let mut pose_input = if use_sim {
        info!("Using the simulated robot");
        PoseInput::Sim(SimRobot::new(sim_params))
    } else {
        let c = PoseClient::new(&net_params).wrap_err("Failed to initialise the PoseClient")?;
        info!("PoseClient listening on {:?}", c.local_addr());
        PoseInput::Tracker(c)
    };

    let link = if use_sim {
        MotorLink::offline(motor_link_params)
    } else {
        let mut l = MotorLink::new(motor_link_params, net_params.clone());

        // A link which can't be opened is degraded, not fatal. It can be reinitialised by TC.
        if let Err(e) = l.init() {
            warn!("Motor link unavailable: {}", e);
        }
        l
    };

    let nav = NavCtrl::new(
        nav_ctrl_params,
        link,
        Box::new(DirectPlanner::new()),
        broker.clone(),
    )
    .wrap_err("Failed to initialise NavCtrl")?;
    info!("NavCtrl init complete");

    let mut robot = RobotCtrl::new(nav, LocationRegistry::from_params(locations_params))
        .wrap_err("Failed to initialise RobotCtrl")?;
    robot.announce_locations_loaded();
    info!("RobotCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let dt_s = exec_params.cycle_period_s;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(exec_params.cycle_frequency_hz());

        // ---- DATA INPUT ----

        if let Some(tm) = robot.nav_mut().link_mut().drain_mailbox() {
            ds.motor_tm = Some(tm);
        }

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            TcSource::Remote(ref mut client) => match client.recieve_tcs() {
                Ok(tcs) => {
                    for tc in tcs.iter() {
                        tc_processor::exec(&mut ds, &mut robot, tc);
                    }
                }
                Err(e) => warn!("TcClient error: {}", e),
            },
            TcSource::Script(ref mut si) => match si.get_pending_tcs(ds.sim_time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, &mut robot, tc);
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            },
        }

        // ---- POSE ----

        let pose = match pose_input {
            PoseInput::Tracker(ref mut c) => c.pose(),
            PoseInput::Sim(ref mut s) => s.pose(),
        };
        ds.set_pose(pose, exec_params.pose_loss_warn_cycles);

        // ---- CONTROL PROCESSING ----

        if let Err(e) = robot.update(dt_s, ds.pose) {
            warn!("RobotCtrl processing error: {}", e);
        }

        // ---- AUDIO ----

        cue_player.tick(dt_s);
        audio_monitor.tick(cue_player.is_playing(), &broker);

        // ---- MOTOR LINK ----

        robot.nav_mut().link_mut().process(ds.sim_time_s);

        if let PoseInput::Sim(ref mut s) = pose_input {
            let cmd = robot
                .nav()
                .link()
                .last_transmitted()
                .unwrap_or(DriveCmd::STOP);
            s.step(cmd, dt_s);
        }

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            let nav_tm = robot.nav().tm();
            let link_tm = robot.nav().link().tm();

            info!(
                "{:?}/{:?}: {} (tx {}, rx {})",
                robot.mode(),
                nav_tm.state,
                nav_tm.status,
                link_tm.tx_count,
                link_tm.rx_count
            );

            session.save("tm/nav_tm.json", nav_tm);
            session.save("tm/link_tm.json", link_tm);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!("Shutting down");

    robot.shutdown();
    robot.nav_mut().link_mut().process(ds.sim_time_s);
    robot.nav_mut().link_mut().close();

    cue_player.detach(&broker);
    mic_gate.detach(&broker);
    broker.clear_all();

    info!("End of execution");

    session.exit();

    Ok(())
}
