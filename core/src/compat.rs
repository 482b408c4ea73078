//! Name correspondences between the two theme packaging conventions.
//!
//! Theme authors target either the stock component names or the vendor ones,
//! both layouts are accepted by translating names that failed to resolve.

use phf::phf_map;

/// Component archive -> package whose theme archive covers the same app
static PACKAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "com.android.contacts" => "com.android.dialer",
    "com.android.dialer" => "com.android.contacts",
    "com.android.launcher" => "com.miui.home",
    "com.miui.home" => "com.android.launcher",
    "com.android.mms" => "com.android.messaging",
    "com.android.messaging" => "com.android.mms",
    "com.android.deskclock" => "com.android.alarmclock",
    "com.android.alarmclock" => "com.android.deskclock",
    "com.android.music" => "com.miui.player",
    "com.miui.player" => "com.android.music",
    "com.android.gallery3d" => "com.miui.gallery",
    "com.miui.gallery" => "com.android.gallery3d",
};

/// Owner package -> file name pairs, both directions listed
static RESOURCE_NAMES: phf::Map<&'static str, &'static [(&'static str, &'static str)]> = phf_map! {
    "android" => &[
        ("status_bar_background.png", "statusbar_background.png"),
        ("statusbar_background.png", "status_bar_background.png"),
        ("btn_default_normal.9.png", "btn_default_normal_holo_light.9.png"),
        ("btn_default_normal_holo_light.9.png", "btn_default_normal.9.png"),
        ("btn_default_pressed.9.png", "btn_default_pressed_holo_light.9.png"),
        ("btn_default_pressed_holo_light.9.png", "btn_default_pressed.9.png"),
        ("dialog_bg.9.png", "dialog_full_holo_light.9.png"),
        ("dialog_full_holo_light.9.png", "dialog_bg.9.png"),
    ],
    "com.android.systemui" => &[
        ("stat_sys_battery.png", "stat_sys_battery_circle.png"),
        ("stat_sys_battery_circle.png", "stat_sys_battery.png"),
        ("stat_sys_battery_charge.png", "stat_sys_battery_charge_circle.png"),
        ("stat_sys_battery_charge_circle.png", "stat_sys_battery_charge.png"),
        ("notification_panel_bg.9.png", "notification_header_bg.9.png"),
        ("notification_header_bg.9.png", "notification_panel_bg.9.png"),
        ("stat_sys_wifi_signal_4.png", "stat_sys_wifi_signal_4_fully.png"),
        ("stat_sys_wifi_signal_4_fully.png", "stat_sys_wifi_signal_4.png"),
    ],
    "com.android.launcher" => &[
        ("workspace_bg.png", "default_wallpaper.png"),
        ("default_wallpaper.png", "workspace_bg.png"),
        ("ic_allapps.png", "all_apps_button_icon.png"),
        ("all_apps_button_icon.png", "ic_allapps.png"),
    ],
    "com.android.dialer" => &[
        ("dial_num_1.png", "dial_num_1_wht.png"),
        ("dial_num_1_wht.png", "dial_num_1.png"),
        ("ic_dial_action_call.png", "dial_call_button.png"),
        ("dial_call_button.png", "ic_dial_action_call.png"),
    ],
    "com.android.mms" => &[
        ("conversation_item_background.9.png", "message_bubble_incoming.9.png"),
        ("message_bubble_incoming.9.png", "conversation_item_background.9.png"),
    ],
};

/// Static translation tables, stateless
#[derive(Debug, Default, Clone, Copy)]
pub struct CompatibilityMapper;

impl CompatibilityMapper {
    /// Package whose theme archive stands in for `component`
    pub fn map_package(component: &str) -> Option<&'static str> {
        PACKAGES.get(component).copied()
    }

    /// Alternative name of `file_name` within `owner`'s resources
    ///
    /// Only the file name is translated, the directory part of a path is
    /// kept as is.
    pub fn map_resource_name(owner: &str, file_name: &str) -> Option<String> {
        let pairs = RESOURCE_NAMES.get(owner)?;
        let (dir, name) = match file_name.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, file_name),
        };

        let (_, mapped) = pairs.iter().find(|(from, _)| *from == name)?;
        Some(match dir {
            Some(dir) => format!("{}/{}", dir, mapped),
            None => (*mapped).to_owned(),
        })
    }
}
