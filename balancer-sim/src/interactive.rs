use std::io::{BufRead, Write};

use anyhow::Result;
use balancer_core::Balancer;
use tracing::info;

use crate::report::{print_dispatch, print_rebalance, print_servers, print_summary};
use crate::tasks::TaskSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    AssignNext,
    AssignAll,
    Rebalance,
    Status,
    Exit,
}

impl MenuAction {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().parse::<u8>().ok()? {
            1 => Some(MenuAction::AssignNext),
            2 => Some(MenuAction::AssignAll),
            3 => Some(MenuAction::Rebalance),
            4 => Some(MenuAction::Status),
            5 => Some(MenuAction::Exit),
            _ => None,
        }
    }
}

/// Step-driven simulation: the user picks one action at a time until every
/// task is assigned or the exit entry is chosen.
///
/// End of input is handled like the exit entry.
pub(crate) fn run_menu<R: BufRead, W: Write>(
    balancer: &mut Balancer,
    tasks: &mut TaskSource,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let threshold_pct = balancer.config().threshold_pct;

    while tasks.remaining() > 0 {
        writeln!(out, "\n--- Simulation Menu ({} tasks left) ---", tasks.remaining())?;
        writeln!(out, "1. Assign next task")?;
        writeln!(out, "2. Assign all remaining tasks")?;
        writeln!(out, "3. Trigger manual rebalance")?;
        writeln!(out, "4. Show server status")?;
        writeln!(out, "5. Exit simulation")?;

        let Some(action) = read_action(input, out)? else {
            break;
        };

        match action {
            MenuAction::AssignNext => {
                if let Some(load) = tasks.next() {
                    let report = balancer.dispatch(load)?;
                    print_dispatch(out, &report, threshold_pct)?;
                }
            }
            MenuAction::AssignAll => {
                writeln!(out, "\nAssigning all remaining {} tasks...", tasks.remaining())?;
                for load in tasks.by_ref() {
                    let report = balancer.dispatch(load)?;
                    print_dispatch(out, &report, threshold_pct)?;
                }
            }
            MenuAction::Rebalance => {
                writeln!(out, "\nTriggering manual rebalance...")?;
                let outcome = balancer.rebalance()?;
                print_rebalance(out, &outcome, threshold_pct)?;
            }
            MenuAction::Status => {
                print_servers(out, balancer.nodes())?;
                writeln!(out, "Average Load: {:.2}", balancer.summary()?.average_load)?;
            }
            MenuAction::Exit => {
                writeln!(
                    out,
                    "\nExiting simulation. The remaining {} tasks will NOT be assigned.",
                    tasks.remaining()
                )?;
                break;
            }
        }
    }

    info!(
        assigned = tasks.taken(),
        skipped = tasks.remaining(),
        "interactive simulation finished"
    );

    writeln!(out, "\n=== FINAL LOAD DISTRIBUTION ===")?;
    print_servers(out, balancer.nodes())?;
    print_summary(out, &balancer.summary()?)?;
    Ok(())
}

/// Prompts until a valid menu entry is read, `None` on end of input.
fn read_action<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<MenuAction>> {
    let mut line = String::new();
    loop {
        write!(out, "Choose action (1-5): ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match MenuAction::parse(&line) {
            Some(action) => return Ok(Some(action)),
            None => writeln!(out, "Invalid input! Please enter a number between 1 and 5.")?,
        }
    }
}
