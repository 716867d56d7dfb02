//! `newsdeck user`: show a profile.

use newsdeck_core::{NewsClient, User};

use crate::cli::{GlobalOpts, UserArgs};
use crate::commands::item::plain_text;
use crate::error::CliError;
use crate::output::{self, bold, relative_time, should_color};

fn detail(user: &User, color: bool) -> String {
    let mut lines = vec![
        bold(&user.id, color),
        format!("karma:     {}", user.karma),
        format!("created:   {}", relative_time(user.created)),
        format!("submitted: {}", user.submitted.len()),
    ];
    if let Some(ref about) = user.about {
        lines.push(String::new());
        lines.push(plain_text(about));
    }
    lines.join("\n")
}

pub async fn handle(client: &NewsClient, args: UserArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let user = client
        .user(&args.name)
        .await?
        .ok_or_else(|| CliError::not_found("User", &args.name))?;

    let color = should_color(&global.color);
    let out = output::render_single(&global.output, &user, |u| detail(u, color), |u| u.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
