//! `flair entities list|get`.

use super::util::{self, EntityRow, EntityView, Selection};
use crate::cli::{EntitiesArgs, EntitiesCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    session: &Session,
    args: EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        EntitiesCommand::List(filter) => {
            let selection = Selection::parse(&filter)?;
            let coordinator = util::start(session, false, global.quiet).await?;
            let views: Vec<EntityView> = selection
                .apply(coordinator.entities())
                .into_iter()
                .map(|e| EntityView::render(&coordinator, e, session.units))
                .collect();
            coordinator.shutdown().await;

            let out = output::render_list(
                global.output,
                &views,
                |v| EntityRow::from_view(v, color),
                |v| v.entity.unique_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EntitiesCommand::Get { unique_id } => {
            let coordinator = util::start(session, false, global.quiet).await?;
            let found = util::find_entity(&coordinator, &unique_id);
            let view = found.map(|e| EntityView::render(&coordinator, e, session.units));
            coordinator.shutdown().await;
            let view = view?;

            let out = output::render_single(
                global.output,
                &view,
                |v| detail(v, color),
                |v| v.summary(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn detail(view: &EntityView, color: bool) -> String {
    let entity = &view.entity;
    let mut pairs = vec![
        ("ID", output::highlight(&entity.unique_id, color)),
        ("Name", entity.display_name()),
        ("Platform", entity.platform().to_string()),
        ("Device", format!("{} ({})", entity.device.name, entity.device.model)),
        ("Manufacturer", entity.device.manufacturer.clone()),
        ("Structure", entity.structure_id.clone()),
        ("Available", output::availability(view.state.available, color)),
        ("State", view.summary()),
    ];
    if let Some(category) = entity.entity_category {
        pairs.push(("Category", category.to_string()));
    }
    if !entity.enabled_by_default {
        pairs.push(("Enabled", output::dim("disabled by default", color)));
    }
    output::detail_block(&pairs)
}
