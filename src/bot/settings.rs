use dashmap::DashMap;
use serenity::model::{
    id::{ChannelId, GuildId, RoleId},
    Permissions,
};
use tracing::info;

use super::request::MemberAccess;

/// Configuración de un servidor fijada con `/setup`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildSettings {
    pub dj_role: Option<RoleId>,
    pub music_channel: Option<ChannelId>,
}

/// Ajustes por servidor, sólo en memoria
#[derive(Default)]
pub struct SettingsRegistry {
    guilds: DashMap<GuildId, GuildSettings>,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> GuildSettings {
        self.guilds
            .get(&guild_id)
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Aplica `/setup`; los valores omitidos se conservan
    pub fn apply_setup(
        &self,
        guild_id: GuildId,
        music_channel: Option<ChannelId>,
        dj_role: Option<RoleId>,
    ) -> GuildSettings {
        let mut entry = self.guilds.entry(guild_id).or_default();
        if music_channel.is_some() {
            entry.music_channel = music_channel;
        }
        if dj_role.is_some() {
            entry.dj_role = dj_role;
        }
        info!(
            "⚙️ Configuración de {}: canal {:?}, rol DJ {:?}",
            guild_id, entry.music_channel, entry.dj_role
        );
        entry.clone()
    }

    /// Control de DJ: sin rol configurado todos pasan; con rol, hace falta el
    /// rol, Gestionar canales o Administrador.
    pub fn is_authorized(&self, guild_id: GuildId, member: &MemberAccess) -> bool {
        let Some(dj_role) = self.get(guild_id).dj_role else {
            return true;
        };

        member.roles.contains(&dj_role)
            || member
                .permissions
                .intersects(Permissions::MANAGE_CHANNELS | Permissions::ADMINISTRATOR)
    }

    /// Sólo quien gestiona el servidor puede usar `/setup`
    pub fn can_configure(member: &MemberAccess) -> bool {
        member
            .permissions
            .intersects(Permissions::MANAGE_GUILD | Permissions::ADMINISTRATOR)
    }

    /// Canal donde se publican los avisos de reproducción
    pub fn notification_channel(&self, guild_id: GuildId, fallback: ChannelId) -> ChannelId {
        self.get(guild_id).music_channel.unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUILD: GuildId = GuildId::new(1);
    const DJ: RoleId = RoleId::new(42);

    fn member(roles: Vec<RoleId>, permissions: Permissions) -> MemberAccess {
        MemberAccess::new(roles, permissions)
    }

    #[test]
    fn test_everyone_is_dj_without_role() {
        let registry = SettingsRegistry::new();
        assert!(registry.is_authorized(GUILD, &member(vec![], Permissions::empty())));
    }

    #[test]
    fn test_dj_role_gate() {
        let registry = SettingsRegistry::new();
        registry.apply_setup(GUILD, None, Some(DJ));

        assert!(!registry.is_authorized(GUILD, &member(vec![RoleId::new(7)], Permissions::empty())));
        assert!(registry.is_authorized(GUILD, &member(vec![DJ], Permissions::empty())));
        assert!(registry.is_authorized(GUILD, &member(vec![], Permissions::MANAGE_CHANNELS)));
        assert!(registry.is_authorized(GUILD, &member(vec![], Permissions::ADMINISTRATOR)));
    }

    #[test]
    fn test_setup_keeps_omitted_values() {
        let registry = SettingsRegistry::new();
        registry.apply_setup(GUILD, Some(ChannelId::new(9)), None);
        let settings = registry.apply_setup(GUILD, None, Some(DJ));

        assert_eq!(
            settings,
            GuildSettings {
                dj_role: Some(DJ),
                music_channel: Some(ChannelId::new(9)),
            }
        );
        assert_eq!(registry.notification_channel(GUILD, ChannelId::new(3)), ChannelId::new(9));
        assert_eq!(
            registry.notification_channel(GuildId::new(2), ChannelId::new(3)),
            ChannelId::new(3)
        );
    }

    #[test]
    fn test_can_configure() {
        assert!(SettingsRegistry::can_configure(&member(vec![], Permissions::MANAGE_GUILD)));
        assert!(!SettingsRegistry::can_configure(&member(vec![DJ], Permissions::MANAGE_CHANNELS)));
    }
}
