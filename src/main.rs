use bsh::config::ConfigLoader;
use bsh::repl::Shell;
use bsh::terminal::ShellTerminalState;

fn main() {
    env_logger::init();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bsh: {}", e);
            ConfigLoader::default_config()
        }
    };

    let terminal = match ShellTerminalState::init() {
        Ok(terminal) => terminal,
        Err(e) => {
            eprintln!("bsh: {}", e);
            None
        }
    };

    let code = {
        let mut shell = Shell::new(config, terminal);
        shell.run()
    };
    std::process::exit(code);
}
