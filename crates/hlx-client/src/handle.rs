//! The caller-facing handle.
//!
//! Mutators are thin façades: validate the arguments, build the typed
//! request, and hand it to the engine as an exchange. The engine replies
//! when the amplifier's response frame arrives (or the exchange times
//! out), so every method here resolves with the device's resulting state.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use hlx_model::{
    AmplifierModel, BALANCE_MAX, BALANCE_MIN, BAND_LEVEL_MAX, BAND_LEVEL_MIN, BRIGHTNESS_MAX,
    FREQUENCY_MAX, FREQUENCY_MIN, TONE_LEVEL_MAX, TONE_LEVEL_MIN, VOLUME_MAX, VOLUME_MIN,
};
use hlx_proto::{validate_name, Error, Identifier, Kind, Request, Response};

use crate::app::EngineCommand;
use crate::connection::ConnectionState;

#[derive(Clone)]
pub struct HlxClient {
    tx: mpsc::Sender<EngineCommand>,
}

fn check_range<T: PartialOrd>(value: T, min: T, max: T, what: &'static str) -> Result<(), Error> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::ValueOutOfRange(what))
    }
}

impl HlxClient {
    pub(crate) fn new(tx: mpsc::Sender<EngineCommand>) -> HlxClient {
        HlxClient { tx }
    }

    async fn send(&self, command: EngineCommand) -> Result<(), Error> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::NotInitialized)
    }

    async fn submit(&self, request: Request) -> Result<Response, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Submit { request, reply }).await?;
        rx.await.map_err(|_| Error::NotInitialized)?
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub async fn connect(&self, url: &str, deadline: Duration) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Connect {
            url: url.to_owned(),
            deadline,
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::NotInitialized)?
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Disconnect { reply }).await?;
        rx.await.map_err(|_| Error::NotInitialized)?
    }

    pub async fn connection_state(&self) -> Result<ConnectionState, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::State { reply }).await?;
        rx.await.map(|(state, _)| state).map_err(|_| Error::NotInitialized)
    }

    /// Scheme, host, and port of the peer, once a connect has succeeded.
    pub async fn peer_url(&self) -> Result<Option<hlx_proto::ControlUrl>, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::State { reply }).await?;
        rx.await.map(|(_, url)| url).map_err(|_| Error::NotInitialized)
    }

    /// Rebuild the whole local model from the peer. Resolves when
    /// `DidRefresh` has been emitted.
    pub async fn refresh(&self, timeout: Duration) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Refresh { timeout, reply }).await?;
        rx.await.map_err(|_| Error::NotInitialized)?
    }

    /// A copy of the current local model.
    pub async fn snapshot(&self) -> Result<AmplifierModel, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::NotInitialized)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineCommand::Shutdown).await;
    }

    // ------------------------------------------------------------------
    // Zone mutators
    // ------------------------------------------------------------------

    fn zone_id(zone: u8) -> Result<Identifier, Error> {
        Kind::Zone.checked(zone.into())
    }

    pub async fn set_zone_volume(&self, zone: u8, level: i8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(level, VOLUME_MIN, VOLUME_MAX, "volume")?;
        self.submit(Request::SetZoneVolume { zone, level })
            .await
            .map(drop)
    }

    /// Nudge the volume one step up; resolves with the resulting level.
    pub async fn zone_volume_up(&self, zone: u8) -> Result<i8, Error> {
        let zone = Self::zone_id(zone)?;
        match self.submit(Request::ZoneVolumeUp { zone }).await? {
            Response::ZoneVolume { level, .. } => Ok(level),
            other => Err(Error::Protocol(format!("unexpected reply {other}"))),
        }
    }

    pub async fn zone_volume_down(&self, zone: u8) -> Result<i8, Error> {
        let zone = Self::zone_id(zone)?;
        match self.submit(Request::ZoneVolumeDown { zone }).await? {
            Response::ZoneVolume { level, .. } => Ok(level),
            other => Err(Error::Protocol(format!("unexpected reply {other}"))),
        }
    }

    pub async fn set_zone_mute(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::SetZoneMute { zone }).await.map(drop)
    }

    pub async fn clear_zone_mute(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::ClearZoneMute { zone }).await.map(drop)
    }

    /// Toggle mute; resolves with the resulting state.
    pub async fn toggle_zone_mute(&self, zone: u8) -> Result<bool, Error> {
        let zone = Self::zone_id(zone)?;
        match self.submit(Request::ToggleZoneMute { zone }).await? {
            Response::ZoneMute { muted, .. } => Ok(muted),
            other => Err(Error::Protocol(format!("unexpected reply {other}"))),
        }
    }

    pub async fn set_zone_balance(&self, zone: u8, balance: i8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(balance, BALANCE_MIN, BALANCE_MAX, "balance")?;
        self.submit(Request::SetZoneBalance { zone, balance })
            .await
            .map(drop)
    }

    pub async fn set_zone_bass(&self, zone: u8, level: i8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(level, TONE_LEVEL_MIN, TONE_LEVEL_MAX, "bass")?;
        self.submit(Request::SetZoneBass { zone, level })
            .await
            .map(drop)
    }

    pub async fn set_zone_treble(&self, zone: u8, level: i8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(level, TONE_LEVEL_MIN, TONE_LEVEL_MAX, "treble")?;
        self.submit(Request::SetZoneTreble { zone, level })
            .await
            .map(drop)
    }

    pub async fn zone_bass_up(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::ZoneBassUp { zone }).await.map(drop)
    }

    pub async fn zone_bass_down(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::ZoneBassDown { zone }).await.map(drop)
    }

    pub async fn zone_treble_up(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::ZoneTrebleUp { zone }).await.map(drop)
    }

    pub async fn zone_treble_down(&self, zone: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        self.submit(Request::ZoneTrebleDown { zone }).await.map(drop)
    }

    pub async fn set_zone_source(&self, zone: u8, source: u8) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        let source = Kind::Source.checked(source.into())?;
        self.submit(Request::SetZoneSource { zone, source })
            .await
            .map(drop)
    }

    pub async fn set_zone_name(&self, zone: u8, name: &str) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        validate_name(name)?;
        self.submit(Request::SetZoneName {
            zone,
            name: name.to_owned(),
        })
        .await
        .map(drop)
    }

    pub async fn set_zone_highpass(&self, zone: u8, frequency: u16) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(frequency, FREQUENCY_MIN, FREQUENCY_MAX, "highpass")?;
        self.submit(Request::SetZoneHighpass { zone, frequency })
            .await
            .map(drop)
    }

    pub async fn set_zone_lowpass(&self, zone: u8, frequency: u16) -> Result<(), Error> {
        let zone = Self::zone_id(zone)?;
        check_range(frequency, FREQUENCY_MIN, FREQUENCY_MAX, "lowpass")?;
        self.submit(Request::SetZoneLowpass { zone, frequency })
            .await
            .map(drop)
    }

    // ------------------------------------------------------------------
    // Source / group / favorite / preset mutators
    // ------------------------------------------------------------------

    pub async fn set_source_name(&self, source: u8, name: &str) -> Result<(), Error> {
        let source = Kind::Source.checked(source.into())?;
        validate_name(name)?;
        self.submit(Request::SetSourceName {
            source,
            name: name.to_owned(),
        })
        .await
        .map(drop)
    }

    pub async fn set_group_name(&self, group: u8, name: &str) -> Result<(), Error> {
        let group = Kind::Group.checked(group.into())?;
        validate_name(name)?;
        self.submit(Request::SetGroupName {
            group,
            name: name.to_owned(),
        })
        .await
        .map(drop)
    }

    pub async fn add_zone_to_group(&self, group: u8, zone: u8) -> Result<(), Error> {
        let group = Kind::Group.checked(group.into())?;
        let zone = Self::zone_id(zone)?;
        self.submit(Request::AddGroupZone { group, zone })
            .await
            .map(drop)
    }

    pub async fn remove_zone_from_group(&self, group: u8, zone: u8) -> Result<(), Error> {
        let group = Kind::Group.checked(group.into())?;
        let zone = Self::zone_id(zone)?;
        self.submit(Request::RemoveGroupZone { group, zone })
            .await
            .map(drop)
    }

    pub async fn set_favorite_name(&self, favorite: u8, name: &str) -> Result<(), Error> {
        let favorite = Kind::Favorite.checked(favorite.into())?;
        validate_name(name)?;
        self.submit(Request::SetFavoriteName {
            favorite,
            name: name.to_owned(),
        })
        .await
        .map(drop)
    }

    pub async fn set_preset_name(&self, preset: u8, name: &str) -> Result<(), Error> {
        let preset = Kind::EqualizerPreset.checked(preset.into())?;
        validate_name(name)?;
        self.submit(Request::SetPresetName {
            preset,
            name: name.to_owned(),
        })
        .await
        .map(drop)
    }

    pub async fn set_preset_band(&self, preset: u8, band: u8, level: i8) -> Result<(), Error> {
        let preset = Kind::EqualizerPreset.checked(preset.into())?;
        let band = Kind::EqualizerBand.checked(band.into())?;
        check_range(level, BAND_LEVEL_MIN, BAND_LEVEL_MAX, "band level")?;
        self.submit(Request::SetPresetBand {
            preset,
            band,
            level,
        })
        .await
        .map(drop)
    }

    pub async fn preset_band_up(&self, preset: u8, band: u8) -> Result<(), Error> {
        let preset = Kind::EqualizerPreset.checked(preset.into())?;
        let band = Kind::EqualizerBand.checked(band.into())?;
        self.submit(Request::PresetBandUp { preset, band })
            .await
            .map(drop)
    }

    pub async fn preset_band_down(&self, preset: u8, band: u8) -> Result<(), Error> {
        let preset = Kind::EqualizerPreset.checked(preset.into())?;
        let band = Kind::EqualizerBand.checked(band.into())?;
        self.submit(Request::PresetBandDown { preset, band })
            .await
            .map(drop)
    }

    // ------------------------------------------------------------------
    // Infrared / front panel mutators
    // ------------------------------------------------------------------

    pub async fn set_infrared_disabled(&self, disabled: bool) -> Result<(), Error> {
        self.submit(Request::SetInfraredDisabled { disabled })
            .await
            .map(drop)
    }

    pub async fn set_front_panel_brightness(&self, brightness: u8) -> Result<(), Error> {
        check_range(brightness, 0, BRIGHTNESS_MAX, "brightness")?;
        self.submit(Request::SetFrontPanelBrightness { brightness })
            .await
            .map(drop)
    }

    pub async fn set_front_panel_locked(&self, locked: bool) -> Result<(), Error> {
        self.submit(Request::SetFrontPanelLocked { locked })
            .await
            .map(drop)
    }
}
