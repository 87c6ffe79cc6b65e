/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Motion Configuration ===\n");

    println!("Motion Settings:");
    println!("  Default FPS: {}", config.motion.default_fps);
    println!("  Tick Rate: {} Hz", config.motion.tick_hz);
    println!("  Duration: {}s", config.motion.duration);
    println!("  Repeat Count: {}", config.motion.repeat_count);
    println!("  Autoreverses: {}", config.motion.autoreverses);
    println!("  Timing: {:?}", config.motion.timing);
    println!();

    println!("Logging Settings:");
    println!("  Filter: {}", config.logging.filter);
}
