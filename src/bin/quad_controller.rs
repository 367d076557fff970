/**
 * Quad Controller Binary
 *
 * Runs the stabilizer:
 * 1. Arms the motors and runs the self-test
 * 2. Starts the tilt correction loop
 * 3. Accepts power/rotation/slope commands on stdin
 * 4. Tears down on 'x', end of input, or Ctrl-C
 *
 * Usage: quad_controller [port|--sim] [baud] [config.json] [motor_pins.json led_pins.json]
 * Default: --sim, 9600, built-in config and pins
 */

use quad_stab::quad::{Controller, Rotation, ShutdownGuard, Slope};
use quad_stab::signal;
use quad_stab::sim::SimSensor;
use quad_stab::{ControllerConfig, PinConfig, TiltSample};

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

fn build_controller(args: &[String]) -> quad_stab::Result<Controller>{
    let port = args.get(1).map(|s| s.as_str()).unwrap_or("--sim");
    let baud: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(9600);

    let config = match args.get(3){
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    let pins = match (args.get(4), args.get(5)){
        (Some(motors), Some(leds)) => PinConfig::load(motors, leds)?,
        _ => PinConfig::default(),
    };

    println!("==============================================");
    println!("  Quad Stabilizer");
    println!("==============================================");
    println!("  Port: {}", port);
    println!("  Baud: {}", baud);
    println!("  Loop: {:.1} Hz", config.loop_frequency);
    println!("==============================================\n");

    if port == "--sim"{
        let sensor = SimSensor::constant(TiltSample::default());
        Controller::simulated(pins, config, sensor).map(|(c, _, _)| c)
    }else{
        Controller::over_serial(port, baud, pins, config)
    }
}

fn print_help(){
    println!("\n[Commands]");
    println!("  p <0-10>        - set main power");
    println!("  r <left|stay|right> [c]                   - rotate (c: clear slope)");
    println!("  s <stay|forward|backward|left|right> [c]  - slope (c: clear rotation)");
    println!("  g               - show motor duties");
    println!("  x               - exit\n");
}

fn handle_command(controller: &Controller, line: &str) -> bool{
    let mut parts = line.split_whitespace();
    let cmd = match parts.next(){
        Some(cmd) => cmd,
        None => return true,
    };
    let arg = parts.next();
    let clear = parts.next() == Some("c");

    let result = match (cmd, arg){
        ("p", Some(v)) => match v.parse::<f32>(){
            Ok(power) => controller.set_main_power(power),
            Err(_) =>{
                println!("Not a number: {}", v);
                Ok(())
            }
        },
        ("r", Some(v)) => v.parse::<Rotation>()
            .and_then(|r| controller.set_rotation(r, clear)),
        ("s", Some(v)) => v.parse::<Slope>()
            .and_then(|s| controller.set_slope(s, clear)),
        ("g", _) =>{
            for (motor, duty) in controller.get_powers(){
                println!("  motor {}: {:.3}%", motor, duty);
            }
            let snap = controller.snapshot();
            println!("  rotation={} slope={} dx={:.2} dy={:.2}", snap.rotation, snap.slope, snap.x_delta, snap.y_delta);
            Ok(())
        }
        ("x" | "exit" | "quit", _) => return false,
        ("h" | "help", _) =>{
            print_help();
            Ok(())
        }
        _ =>{
            println!("Unknown command: {}", line);
            Ok(())
        }
    };

    if let Err(e) = result{
        println!("[ERROR] {}", e);
    }
    true
}

fn main() -> ExitCode{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = signal::install_interrupt_handler(){
        log::warn!("Could not install interrupt handler: {}", e);
    }

    let args: Vec<String> = std::env::args().collect();
    let controller = match build_controller(&args){
        Ok(c) => Arc::new(c),
        Err(e) =>{
            log::error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    //teardown runs on every exit path from here on
    let mut guard = ShutdownGuard::new(Arc::clone(&controller));

    if let Err(e) = controller.start(){
        log::error!("Self-test failed: {}", e);
        return ExitCode::FAILURE;
    }
    match Arc::clone(&controller).start_background(){
        Ok(handle) => guard.set_worker(handle),
        Err(e) =>{
            log::error!("Could not start correction loop: {}", e);
            return ExitCode::FAILURE;
        }
    }

    print_help();

    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move ||{
        let stdin = io::stdin();
        for line in stdin.lock().lines(){
            match line{
                Ok(line) =>{
                    if tx.send(line).is_err(){
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    print!("> ");
    let _ = io::stdout().flush();
    loop{
        if signal::interrupted(){
            println!("\n[INTERRUPTED]");
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)){
            Ok(line) =>{
                if !handle_command(&controller, line.trim()){
                    break;
                }
                print!("> ");
                let _ = io::stdout().flush();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!("[SHUTDOWN]");
    let status = match guard.finish(){
        Ok(()) => ExitCode::SUCCESS,
        Err(e) =>{
            log::error!("Teardown incomplete: {}", e);
            ExitCode::FAILURE
        }
    };
    println!("Goodbye!");
    status
}
