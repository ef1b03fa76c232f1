//! Command interpreters for the simulated shell.

/// Identity of the simulated login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellContext {
    /// Logged-in user
    pub username: String,
    /// Host the user believes they are on
    pub host: String,
}

/// What the simulated shell does with one command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellResponse {
    /// Writes the text followed by a newline
    Output(String),
    /// Clears the screen
    Clear,
    /// Ends the shell; the client sees end of stream
    Exit,
    /// Produces nothing
    Silent,
}

/// Answers command lines for `SimulatedTransport`
pub trait CommandInterpreter: Send + Sync {
    /// Handles one command line, without its trailing newline
    fn execute(&self, ctx: &ShellContext, command: &str) -> ShellResponse;
}

/// A small fixed command table for offline demos
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoInterpreter;

impl CommandInterpreter for DemoInterpreter {
    fn execute(&self, ctx: &ShellContext, command: &str) -> ShellResponse {
        let command = command.trim();
        match command {
            "" => ShellResponse::Silent,
            "ls" => ShellResponse::Output("documents  downloads  public_html".to_string()),
            "whoami" => ShellResponse::Output(ctx.username.clone()),
            "pwd" => ShellResponse::Output(format!("/home/{}", ctx.username)),
            "hostname" => ShellResponse::Output(ctx.host.clone()),
            "uptime" => ShellResponse::Output(
                " 14:23:01 up 42 days,  3:17,  1 user,  load average: 0.08, 0.03, 0.01"
                    .to_string(),
            ),
            "help" => ShellResponse::Output(
                "Available commands: ls, whoami, pwd, hostname, uptime, clear, help, exit"
                    .to_string(),
            ),
            "clear" => ShellResponse::Clear,
            "exit" | "logout" => ShellResponse::Exit,
            other => ShellResponse::Output(format!("bash: {other}: command not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ShellContext {
        ShellContext {
            username: "alice".to_string(),
            host: "demo.local".to_string(),
        }
    }

    #[test]
    fn test_known_commands() {
        let shell = DemoInterpreter;
        assert_eq!(
            shell.execute(&ctx(), "whoami"),
            ShellResponse::Output("alice".to_string())
        );
        assert_eq!(
            shell.execute(&ctx(), "  pwd "),
            ShellResponse::Output("/home/alice".to_string())
        );
        assert_eq!(shell.execute(&ctx(), "clear"), ShellResponse::Clear);
        assert_eq!(shell.execute(&ctx(), "exit"), ShellResponse::Exit);
        assert_eq!(shell.execute(&ctx(), ""), ShellResponse::Silent);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            DemoInterpreter.execute(&ctx(), "frobnicate"),
            ShellResponse::Output("bash: frobnicate: command not found".to_string())
        );
    }
}
