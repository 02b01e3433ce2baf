use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::{
        application::{CommandInteraction, ComponentInteraction, ResolvedValue},
        channel::Message,
        guild::Member,
        id::{ChannelId, GuildId, UserId},
        Permissions,
    },
    prelude::Context,
};
use tracing::{debug, info};

use super::{
    dispatch::{Dispatcher, Reply},
    request::{Command, CommandRequest, MemberAccess, OptionValue, Origin},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    dispatcher: &Dispatcher,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let options = slash_options(&command);
    let parsed = match Command::from_slash(&command.data.name, &options) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            return respond_to_command(ctx, &command, Reply::private(e.to_string())).await;
        }
        None => {
            return respond_to_command(ctx, &command, Reply::private("❌ Comando no reconocido"))
                .await;
        }
    };

    // La búsqueda puede superar los 3 segundos de Discord
    let deferred = matches!(parsed, Command::Play(_));
    if deferred {
        command.defer(&ctx.http).await?;
    }

    let request = CommandRequest {
        origin: Origin::Slash,
        guild_id,
        text_channel: command.channel_id,
        user_id: command.user.id,
        voice_channel: user_voice_channel(ctx, guild_id, command.user.id),
        member: command
            .member
            .as_deref()
            .map(interaction_access)
            .unwrap_or_else(|| MemberAccess::new(Vec::new(), Permissions::empty())),
        command: parsed,
    };

    let reply = dispatcher.dispatch(request).await;
    if deferred {
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(reply.content))
            .await?;
        Ok(())
    } else {
        respond_to_command(ctx, &command, reply).await
    }
}

/// Maneja los botones del reproductor
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    dispatcher: &Dispatcher,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let reply = match Command::from_button(&component.data.custom_id) {
        Some(parsed) => {
            let request = CommandRequest {
                origin: Origin::Button,
                guild_id,
                text_channel: component.channel_id,
                user_id: component.user.id,
                voice_channel: user_voice_channel(ctx, guild_id, component.user.id),
                member: component
                    .member
                    .as_ref()
                    .map(interaction_access)
                    .unwrap_or_else(|| MemberAccess::new(Vec::new(), Permissions::empty())),
                command: parsed,
            };
            dispatcher.dispatch(request).await
        }
        None => Reply::private("❌ Botón no reconocido"),
    };

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(reply.content)
                    .ephemeral(reply.ephemeral),
            ),
        )
        .await?;

    Ok(())
}

/// Maneja comandos de texto con prefijo
pub async fn handle_message(
    ctx: &Context,
    msg: &Message,
    prefix: &str,
    dispatcher: &Dispatcher,
) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let parsed = match Command::from_text(&msg.content, prefix) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            msg.reply(&ctx.http, e.to_string()).await?;
            return Ok(());
        }
        None => return Ok(()),
    };

    debug!("💬 Comando de texto {} de {}", parsed.name(), msg.author.name);

    let member = guild_id.member(ctx, msg.author.id).await?;
    let request = CommandRequest {
        origin: Origin::Text,
        guild_id,
        text_channel: msg.channel_id,
        user_id: msg.author.id,
        voice_channel: user_voice_channel(ctx, guild_id, msg.author.id),
        member: message_access(ctx, guild_id, &member),
        command: parsed,
    };

    let reply = dispatcher.dispatch(request).await;
    msg.reply(&ctx.http, reply.content).await?;
    Ok(())
}

async fn respond_to_command(ctx: &Context, command: &CommandInteraction, reply: Reply) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(reply.content)
                    .ephemeral(reply.ephemeral),
            ),
        )
        .await?;
    Ok(())
}

fn slash_options(command: &CommandInteraction) -> Vec<(String, OptionValue)> {
    command
        .data
        .options()
        .into_iter()
        .filter_map(|option| {
            let value = match option.value {
                ResolvedValue::String(text) => OptionValue::Text(text.to_string()),
                ResolvedValue::Integer(number) => OptionValue::Integer(number),
                ResolvedValue::Channel(channel) => OptionValue::Channel(channel.id),
                ResolvedValue::Role(role) => OptionValue::Role(role.id),
                _ => return None,
            };
            Some((option.name.to_string(), value))
        })
        .collect()
}

// Funciones auxiliares

/// Las interacciones ya traen los permisos resueltos del miembro
fn interaction_access(member: &Member) -> MemberAccess {
    MemberAccess::new(
        member.roles.clone(),
        member.permissions.unwrap_or_else(Permissions::empty),
    )
}

fn message_access(ctx: &Context, guild_id: GuildId, member: &Member) -> MemberAccess {
    let permissions = ctx
        .cache
        .guild(guild_id)
        .map(|guild| guild.member_permissions(member))
        .unwrap_or_else(Permissions::empty);
    MemberAccess::new(member.roles.clone(), permissions)
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Usuarios humanos conectados a un canal de voz, sin contar al bot
pub fn count_humans(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> usize {
    let current_user_id = ctx.cache.current_user().id;
    let Some(guild) = guild_id.to_guild_cached(&ctx.cache) else {
        return 0;
    };

    guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel_id) && state.user_id != current_user_id)
        .filter(|state| {
            let is_bot = state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| guild.members.get(&state.user_id).map(|member| member.user.bot))
                .unwrap_or(false);
            !is_bot
        })
        .count()
}
