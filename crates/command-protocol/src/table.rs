//! Command identifier table.
//!
//! Both sides of the process boundary use this table verbatim. Entries are
//! append-only: a published wire identifier is never renamed, removed or
//! reused for another action.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

macro_rules! command_table {
    ($($variant:ident => $name:literal, $wire:literal;)+) => {
        /// Abstract action kinds known to the protocol.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub enum CommandType {
            $($variant,)+
        }

        impl CommandType {
            /// Every entry, in publication order.
            pub const ALL: &'static [CommandType] = &[$(CommandType::$variant,)+];

            /// Abstract action name. Never sent over the wire.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(CommandType::$variant => $name,)+
                }
            }

            /// Stable wire identifier.
            pub const fn wire_id(&self) -> &'static str {
                match self {
                    $(CommandType::$variant => $wire,)+
                }
            }
        }
    };
}

command_table! {
    DispatchEvent => "dispatchEvent", "dispatch-event";
    Click => "click", "click";
    RightClick => "rightClick", "right-click";
    DoubleClick => "doubleClick", "double-click";
    Drag => "drag", "drag";
    DragToElement => "dragToElement", "drag-to-element";
    Hover => "hover", "hover";
    Scroll => "scroll", "scroll";
    ScrollBy => "scrollBy", "scroll-by";
    ScrollIntoView => "scrollIntoView", "scroll-into-view";
    TypeText => "typeText", "type-text";
    SelectText => "selectText", "select-text";
    SelectTextAreaContent => "selectTextAreaContent", "select-text-area-content";
    SelectEditableContent => "selectEditableContent", "select-editable-content";
    PressKey => "pressKey", "press-key";
    Wait => "wait", "wait";
    NavigateTo => "navigateTo", "navigate-to";
    SetFilesToUpload => "setFilesToUpload", "set-files-to-upload";
    ClearUpload => "clearUpload", "clear-upload";
    ExecuteClientFunction => "executeClientFunction", "execute-client-function";
    ExecuteSelector => "executeSelector", "execute-selector";
    TakeScreenshot => "takeScreenshot", "take-screenshot";
    TakeElementScreenshot => "takeElementScreenshot", "take-element-screenshot";
    TakeScreenshotOnFail => "takeScreenshotOnFail", "take-screenshot-on-fail";
    PrepareBrowserManipulation => "prepareBrowserManipulation", "prepare-browser-manipulation";
    ShowAssertionRetriesStatus => "showAssertionRetriesStatus", "show-assertion-retries-status";
    HideAssertionRetriesStatus => "hideAssertionRetriesStatus", "hide-assertion-retries-status";
    SetBreakpoint => "setBreakpoint", "set-breakpoint";
    ResizeWindow => "resizeWindow", "resize-window";
    ResizeWindowToFitDevice => "resizeWindowToFitDevice", "resize-window-to-fit-device";
    MaximizeWindow => "maximizeWindow", "maximize-window";
    SwitchToIframe => "switchToIframe", "switch-to-iframe";
    SwitchToMainWindow => "switchToMainWindow", "switch-to-main-window";
    OpenWindow => "openWindow", "open-window";
    CloseWindow => "closeWindow", "close-window";
    GetCurrentWindow => "getCurrentWindow", "get-current-window";
    GetCurrentWindows => "getCurrentWindows", "get-current-windows";
    // The split acronym is a published identifier; keep it as is.
    GetCurrentCdpSession => "getCurrentCDPSession", "get-current-c-d-p-session";
    SwitchToWindow => "switchToWindow", "switch-to-window";
    SwitchToWindowByPredicate => "switchToWindowByPredicate", "switch-to-window-by-predicate";
    SwitchToParentWindow => "switchToParentWindow", "switch-to-parent-window";
    SwitchToPreviousWindow => "switchToPreviousWindow", "switch-to-previous-window";
    SetNativeDialogHandler => "setNativeDialogHandler", "set-native-dialog-handler";
    GetNativeDialogHistory => "getNativeDialogHistory", "get-native-dialog-history";
    GetBrowserConsoleMessages => "getBrowserConsoleMessages", "get-browser-console-messages";
    GetActiveElement => "getActiveElement", "get-active-element";
    SetTestSpeed => "setTestSpeed", "set-test-speed";
    SetPageLoadTimeout => "setPageLoadTimeout", "set-page-load-timeout";
    Debug => "debug", "debug";
    Assertion => "assertion", "assertion";
    UseRole => "useRole", "useRole";
    TestDone => "testDone", "test-done";
    BackupStorages => "backupStorages", "backup-storages";
    ExecuteExpression => "executeExpression", "execute-expression";
    ExecuteAsyncExpression => "executeAsyncExpression", "execute-async-expression";
    UnlockPage => "unlockPage", "unlock-page";
    CloseChildWindowOnFileDownloading => "closeChildWindowOnFileDownloading", "close-child-window-on-file-downloading";
    Recorder => "recorder", "recorder";
    PrepareClientEnvironmentInDebugMode => "prepareClientEnvironmentInDebugMode", "prepare-client-environment-in-debug-mode";
    GetCookies => "getCookies", "get-cookies";
    SetCookies => "setCookies", "set-cookies";
    DeleteCookies => "deleteCookies", "delete-cookies";
    GetProxyUrl => "getProxyUrl", "get-proxy-url";
    Request => "request", "request";
    SkipJsErrors => "skipJsErrors", "skip-js-errors";
    AddRequestHooks => "addRequestHooks", "add-request-hooks";
    RemoveRequestHooks => "removeRequestHooks", "remove-request-hooks";
    RunCustomAction => "runCustomAction", "run-custom-action";
    Report => "report", "report";
}

static BY_WIRE_ID: Lazy<HashMap<&'static str, CommandType>> = Lazy::new(|| {
    CommandType::ALL
        .iter()
        .map(|command| (command.wire_id(), *command))
        .collect()
});

static BY_NAME: Lazy<HashMap<&'static str, CommandType>> = Lazy::new(|| {
    CommandType::ALL
        .iter()
        .map(|command| (command.name(), *command))
        .collect()
});

impl CommandType {
    pub fn from_wire_id(wire_id: &str) -> Option<CommandType> {
        BY_WIRE_ID.get(wire_id).copied()
    }

    pub fn from_name(name: &str) -> Option<CommandType> {
        BY_NAME.get(name).copied()
    }

    /// Commands executed by the in-page automation engine as simulated input.
    pub const fn is_automation(&self) -> bool {
        matches!(
            self,
            CommandType::DispatchEvent
                | CommandType::Click
                | CommandType::RightClick
                | CommandType::DoubleClick
                | CommandType::Drag
                | CommandType::DragToElement
                | CommandType::Hover
                | CommandType::Scroll
                | CommandType::ScrollBy
                | CommandType::ScrollIntoView
                | CommandType::TypeText
                | CommandType::SelectText
                | CommandType::SelectTextAreaContent
                | CommandType::SelectEditableContent
                | CommandType::PressKey
        )
    }

    pub fn automations() -> impl Iterator<Item = CommandType> {
        Self::ALL.iter().copied().filter(CommandType::is_automation)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl Serialize for CommandType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_id())
    }
}

impl<'de> Deserialize<'de> for CommandType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        CommandType::from_wire_id(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown command identifier `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn wire_ids_are_unique() {
        let wire: HashSet<_> = CommandType::ALL.iter().map(|c| c.wire_id()).collect();
        let names: HashSet<_> = CommandType::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(wire.len(), CommandType::ALL.len());
        assert_eq!(names.len(), CommandType::ALL.len());
        assert_eq!(CommandType::ALL.len(), 69);
    }

    #[test]
    fn lookups_round_trip() {
        for command in CommandType::ALL {
            assert_eq!(CommandType::from_wire_id(command.wire_id()), Some(*command));
            assert_eq!(CommandType::from_name(command.name()), Some(*command));
        }
    }

    #[test]
    fn irregular_identifiers_are_preserved() {
        assert_eq!(
            CommandType::GetCurrentCdpSession.wire_id(),
            "get-current-c-d-p-session"
        );
        assert_eq!(CommandType::UseRole.wire_id(), "useRole");
        assert_eq!(CommandType::from_wire_id("get-current-cdp-session"), None);
    }

    #[test]
    fn automation_subset() {
        let automations: Vec<_> = CommandType::automations().collect();
        assert_eq!(automations.len(), 15);
        assert!(automations.contains(&CommandType::Drag));
        assert!(!CommandType::NavigateTo.is_automation());
    }

    #[test]
    fn serializes_as_wire_id() {
        let json = serde_json::to_string(&CommandType::DragToElement).unwrap();
        assert_eq!(json, "\"drag-to-element\"");
        let back: CommandType = serde_json::from_str("\"select-text-area-content\"").unwrap();
        assert_eq!(back, CommandType::SelectTextAreaContent);
        assert!(serde_json::from_str::<CommandType>("\"dragToElement\"").is_err());
    }
}
