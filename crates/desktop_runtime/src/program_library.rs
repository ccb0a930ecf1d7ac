//! Static program catalog and program-type window metadata.

use desktop_app_contract::{prop, PropsBag};

/// Icon used for unknown program types.
pub const FALLBACK_WINDOW_ICON: &str = "/assets/icons/Folder.png";
/// Icon used for unknown catalog ids.
pub const FALLBACK_PROGRAM_ICON: &str = "/assets/icons/NewFile.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Catalog entry describing a launchable item.
pub struct ProgramDefinition {
    /// Catalog id (also used as desktop icon id).
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Icon URL.
    pub icon: &'static str,
    /// Program type opened by this entry.
    pub program: &'static str,
    /// Start menu category.
    pub category: &'static str,
    /// Whether this is a built-in system item.
    pub is_system: bool,
}

const fn def(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    program: &'static str,
    category: &'static str,
    is_system: bool,
) -> ProgramDefinition {
    ProgramDefinition {
        id,
        name,
        description,
        icon,
        program,
        category,
        is_system,
    }
}

/// Every catalog entry, in start menu order.
#[rustfmt::skip]
pub const PROGRAM_LIBRARY: &[ProgramDefinition] = &[
    def("internet-explorer", "Internet Explorer", "Browse the web", "/assets/icons/InternetExplorer.png", "browser", "Internet", true),
    def("outlook-express", "E-mail", "Send and receive email", "/assets/icons/OutlookExpress.png", "mail", "Internet", true),
    def("windows-media-player", "Windows Media Player", "Play music and videos", "/assets/icons/MediaPlayer.png", "media-player", "Entertainment", true),
    def("windows-messenger", "Windows Messenger", "Chat with friends and family", "/assets/icons/WindowsMessenger.png", "messenger", "Internet", true),
    def("my-computer", "My Computer", "View the contents of your computer", "/assets/icons/My Computer.png", "explorer", "System", true),
    def("my-documents", "My Documents", "Access your documents", "/assets/icons/My Documents.png", "explorer", "System", true),
    def("my-recent-documents", "My Recent Documents", "Access recently used documents", "/assets/icons/RecentDocuments.png", "explorer", "System", true),
    def("my-pictures", "My Pictures", "View your pictures", "/assets/icons/MyPictures.png", "explorer", "System", true),
    def("my-music", "My Music", "Access your music collection", "/assets/icons/MyMusic.png", "explorer", "System", true),
    def("my-network", "My Network Places", "View computers and devices on your network", "/assets/icons/My Network Places.png", "explorer", "System", true),
    def("control-panel", "Control Panel", "Change Windows settings", "/assets/icons/ControlPanel.png", "control-panel", "System", true),
    def("default-programs", "Set Program Access and Defaults", "Choose which programs Windows uses by default", "/assets/icons/TaskbarStartMenu.png", "default-programs", "System", true),
    def("network-connections", "Connect To", "Connect to networks and the Internet", "/assets/icons/Network.png", "network-connections", "System", true),
    def("printers-faxes", "Printers and Faxes", "Set up and manage printers and faxes", "/assets/icons/Fax.png", "printers-faxes", "System", true),
    def("notepad", "Notepad", "Text editor", "/assets/icons/Notepad.png", "notepad", "Accessories", false),
    def("paint", "Paint", "Create and edit drawings", "/assets/icons/Paint.png", "paint", "Accessories", false),
    def("calculator", "Calculator", "Perform basic calculations", "/assets/icons/Calculator.png", "calculator", "Accessories", false),
    def("wordpad", "WordPad", "Rich text editor", "/assets/icons/WordPad.png", "wordpad", "Accessories", false),
    def("cmd", "Command Prompt", "Command line interface", "/assets/icons/CommandPrompt.png", "cmd", "Accessories", true),
    def("minesweeper", "Minesweeper", "Classic puzzle game", "/assets/icons/Minesweeper.png", "minesweeper", "Games", false),
    def("solitaire", "Solitaire", "Card game", "/assets/icons/Solitaire.png", "solitaire", "Games", false),
    def("hearts", "Hearts", "Card game", "/assets/icons/Hearts.png", "hearts", "Games", false),
    def("spider-solitaire", "Spider Solitaire", "Card game", "/assets/icons/SpiderSolitaire.png", "spider-solitaire", "Games", false),
    def("pinball", "3D Pinball", "Pinball game", "/assets/icons/Pinball.png", "pinball", "Games", false),
    def("display-properties", "Display Properties", "Change display settings", "/assets/icons/Display.png", "display-properties", "System", true),
    def("help", "Help and Support", "Get help with Windows XP", "/assets/icons/HelpFile.png", "help", "System", true),
    def("search", "Search", "Search for files and folders", "/assets/icons/Search.png", "search", "System", true),
    def("run", "Run...", "Run a program", "/assets/icons/Run.png", "run", "System", true),
    def("system-restore", "System Restore", "Restore Windows to an earlier time", "/assets/icons/SystemRestore.png", "system-restore", "System", true),
];

/// Resolved catalog entry, owned so unknown ids can echo their own name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProgram {
    /// Catalog id.
    pub id: String,
    /// Display name (the id itself for unknown entries).
    pub name: String,
    /// Icon URL.
    pub icon: String,
    /// Program type to open.
    pub program: String,
    /// Short description.
    pub description: String,
}

/// Looks up a catalog entry. Unknown ids resolve to an `error` program named after the id.
pub fn program_definition(icon_id: &str) -> ResolvedProgram {
    match PROGRAM_LIBRARY.iter().find(|entry| entry.id == icon_id) {
        Some(entry) => ResolvedProgram {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            icon: entry.icon.to_string(),
            program: entry.program.to_string(),
            description: entry.description.to_string(),
        },
        None => ResolvedProgram {
            id: icon_id.to_string(),
            name: icon_id.to_string(),
            icon: FALLBACK_PROGRAM_ICON.to_string(),
            program: "error".to_string(),
            description: "Unknown program".to_string(),
        },
    }
}

/// Resolves the window title and icon for a newly opened instance of `program_type`.
pub fn window_metadata(program_type: &str, props: &PropsBag) -> (String, String) {
    let (title, icon) = match program_type {
        "explorer" => {
            let icon_id: Option<String> = prop(props, "iconId");
            let title = match icon_id.as_deref() {
                Some("my-computer") => "My Computer",
                Some("my-documents") => "My Documents",
                Some("my-network") => "My Network Places",
                _ => "Explorer",
            };
            return (title.to_string(), format!("/assets/icons/{title}.png"));
        }
        "browser" => ("Internet Explorer", "/assets/icons/InternetExplorer.png"),
        "notepad" => ("Notepad", "/assets/icons/Notepad.png"),
        "calculator" => ("Calculator", "/assets/icons/Calculator.png"),
        "control-panel" => ("Control Panel", "/assets/icons/ControlPanel.png"),
        "display-properties" => ("Display Properties", "/assets/icons/Display.png"),
        "error-dialog" => ("System Error", "/assets/icons/ErrorDialog.png"),
        "system-restore" => ("System Restore", "/assets/icons/SystemRestore.png"),
        _ => ("Program", FALLBACK_WINDOW_ICON),
    };
    (title.to_string(), icon.to_string())
}
