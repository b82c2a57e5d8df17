//! The ChoiceScript command table.

/// Static description of a `*command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command name without the leading `*`.
    pub name: &'static str,
    /// Whether the command may have an indented body.
    pub block: bool,
    /// Whether control never falls through to the next line.
    pub terminal: bool,
    /// Whether the command requires an argument.
    pub needs_argument: bool,
    /// One-line description shown in completion and hover.
    pub description: &'static str,
}

const fn cmd(
    name: &'static str,
    block: bool,
    terminal: bool,
    needs_argument: bool,
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        block,
        terminal,
        needs_argument,
        description,
    }
}

/// Every command ChoiceScript understands, sorted by name.
pub const COMMANDS: &[CommandSpec] = &[
    cmd("abort", false, true, false, "Stop the current scene immediately."),
    cmd("achieve", false, false, true, "Award an achievement."),
    cmd("achievement", true, false, true, "Declare an achievement (startup only)."),
    cmd("allow_reuse", false, false, false, "Allow an option to be chosen again."),
    cmd("author", false, false, true, "Set the game's author."),
    cmd("bug", false, true, false, "Report a bug and stop the game."),
    cmd("check_achievements", false, false, false, "Refresh achievement variables."),
    cmd("check_purchase", false, false, true, "Check whether a product was purchased."),
    cmd("check_registration", false, false, false, "Check whether the player is registered."),
    cmd("choice", true, false, false, "Present a set of options to the player."),
    cmd("comment", true, false, false, "A comment that is not shown to the player."),
    cmd("create", false, false, true, "Declare a global variable (startup only)."),
    cmd("delay_break", false, false, true, "Pause the game for a number of seconds."),
    cmd("delay_ending", false, false, true, "End the game after a delay."),
    cmd("delete", false, false, true, "Delete a temporary variable."),
    cmd("disable_reuse", false, false, false, "Prevent options from being chosen again."),
    cmd("else", true, false, false, "Run the body when no preceding condition held."),
    cmd("elseif", true, false, true, "Run the body when this condition holds."),
    cmd("elsif", true, false, true, "Alias of *elseif."),
    cmd("end_trial", false, true, false, "End the trial version of the game."),
    cmd("ending", false, true, false, "End the game."),
    cmd("fake_choice", true, false, false, "A choice whose options all fall through."),
    cmd("finish", false, true, false, "Continue to the next scene in the scene list."),
    cmd("gosub", false, false, true, "Jump to a label and return afterwards."),
    cmd("gosub_scene", false, false, true, "Jump to another scene and return afterwards."),
    cmd("goto", false, true, true, "Jump to a label in this scene."),
    cmd("goto_random_scene", true, true, false, "Jump to a random scene from the list."),
    cmd("goto_scene", false, true, true, "Jump to another scene."),
    cmd("gotoref", false, true, true, "Jump to a label named by a variable."),
    cmd("hide_reuse", false, false, false, "Hide options once they have been chosen."),
    cmd("if", true, false, true, "Run the body when the condition holds."),
    cmd("image", false, false, true, "Show an image."),
    cmd("input_number", false, false, true, "Ask the player for a number."),
    cmd("input_text", false, false, true, "Ask the player for some text."),
    cmd("label", false, false, true, "Mark a place in the scene to jump to."),
    cmd("line_break", false, false, false, "Insert a line break."),
    cmd("link", false, false, true, "Show a hyperlink."),
    cmd("looplimit", false, false, true, "Set the loop limit."),
    cmd("more_games", false, false, false, "Show a link to more games."),
    cmd("page_break", false, false, false, "Show a button that continues on a new page."),
    cmd("params", false, false, false, "Receive the arguments of a *gosub."),
    cmd("print", false, false, true, "Print the value of an expression."),
    cmd("product", false, false, true, "Declare an in-app product."),
    cmd("purchase", false, false, true, "Offer a product for purchase."),
    cmd("rand", false, false, true, "Set a variable to a random number."),
    cmd("redirect_scene", false, true, true, "Restart the game from another scene."),
    cmd("reset", false, false, false, "Reset all variables."),
    cmd("restart", false, true, false, "Restart the game from the beginning."),
    cmd("restore_checkpoint", false, false, false, "Restore a saved checkpoint."),
    cmd("restore_game", false, false, false, "Let the player restore a saved game."),
    cmd("return", false, true, false, "Return from a *gosub."),
    cmd("save_checkpoint", false, false, false, "Save a checkpoint."),
    cmd("save_game", false, false, false, "Let the player save the game."),
    cmd("scene_list", true, false, false, "List the scenes of the game (startup only)."),
    cmd("script", false, false, true, "Run raw JavaScript."),
    cmd(
        "selectable_if",
        false,
        false,
        true,
        "Show an option that is only selectable when the condition holds.",
    ),
    cmd("set", false, false, true, "Change the value of a variable."),
    cmd("setref", false, false, true, "Set a variable named by another variable."),
    cmd("share_this_game", false, false, false, "Show sharing links."),
    cmd("show_password", false, false, false, "Show a password for the current state."),
    cmd("snoop", false, false, false, "Print all variables (debugging)."),
    cmd("sound", false, false, true, "Play a sound."),
    cmd("stat_chart", true, false, false, "Show a chart of statistics."),
    cmd("subscribe", false, false, false, "Ask the player to subscribe."),
    cmd("temp", false, false, true, "Declare a temporary variable for this scene."),
    cmd("text_image", false, false, true, "Show text as an image."),
    cmd("title", false, false, true, "Set the game's title."),
];

/// Look up a command by name (case-insensitive).
#[must_use]
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    let lower = name.to_ascii_lowercase();
    COMMANDS
        .binary_search_by(|spec| spec.name.cmp(lower.as_str()))
        .ok()
        .map(|i| &COMMANDS[i])
}

/// Commands that may only appear in `startup.txt`.
pub const STARTUP_ONLY: &[&str] = &["achievement", "create", "scene_list", "title", "author"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(COMMANDS.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn test_lookup() {
        let goto = lookup("GOTO").unwrap();
        assert!(goto.terminal);
        assert!(goto.needs_argument);
        assert!(lookup("choice").unwrap().block);
        assert!(lookup("gto").is_none());
    }
}
