use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, application::Command, id::GuildId, Permissions},
    prelude::Context,
};

use crate::audio::effects::FilterPreset;

/// Todos los comandos slash del bot
pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        pause_command(),
        resume_command(),
        nowplaying_command(),
        shuffle_command(),
        loop_command(),
        remove_command(),
        clear_command(),
        volume_command(),
        filter_command(),
        autoplay_command(),
        always_on_command(),
        setup_command(),
        help_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta la canción actual")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la música y vacía la cola")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra la canción actual")
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra la cola de reproducción")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Mezcla las canciones siguientes")
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop")
        .description("Cambia el modo de repetición")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "mode", "Modo de repetición")
                .add_string_choice("Desactivado", "off")
                .add_string_choice("Canción", "song")
                .add_string_choice("Cola", "queue"),
        )
}

fn remove_command() -> CreateCommand {
    CreateCommand::new("remove")
        .description("Quita una canción de la cola")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "position", "Posición en la cola")
                .min_int_value(2)
                .required(true),
        )
}

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear").description("Vacía la cola excepto la canción actual")
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Ajusta el volumen")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "level", "Volumen (1-100)")
                .min_int_value(1)
                .max_int_value(100)
                .required(true),
        )
}

fn filter_command() -> CreateCommand {
    let option = FilterPreset::ALL.iter().fold(
        CreateCommandOption::new(CommandOptionType::String, "type", "Filtro de audio").required(true),
        |option, preset| option.add_string_choice(preset.name(), preset.name()),
    );

    CreateCommand::new("filter")
        .description("Aplica un filtro de audio")
        .add_option(option)
}

fn autoplay_command() -> CreateCommand {
    CreateCommand::new("autoplay").description("Reproduce canciones relacionadas al terminar la cola")
}

fn always_on_command() -> CreateCommand {
    CreateCommand::new("247").description("Mantiene al bot en el canal de voz")
}

// Administración

fn setup_command() -> CreateCommand {
    CreateCommand::new("setup")
        .description("Configura el canal de música y el rol DJ")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .add_option(CreateCommandOption::new(
            CommandOptionType::Channel,
            "channel",
            "Canal para los avisos de música",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::Role,
            "djrole",
            "Rol con permisos de DJ",
        ))
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Muestra los comandos disponibles")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_command_names_are_unique_and_parseable() {
        let names: Vec<String> = all_commands()
            .iter()
            .map(|command| {
                serde_json::to_value(command).unwrap()["name"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();

        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(names.contains(&"247".to_string()));

        for name in &names {
            assert!(
                crate::bot::request::Command::from_slash(name, &[]).is_some(),
                "/{} has no parser",
                name
            );
        }
    }
}
