use std::io::{self, Write};
use std::panic;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("panic: {panic_info}");
        log::logger().flush();

        // keep the REPL prompt from swallowing the report
        let _ = writeln!(io::stderr());

        default_hook(panic_info);

        std::process::exit(1);
    }));
}
