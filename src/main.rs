use iced::widget::{button, column, container, image, row, scrollable, text, Column};
use iced::{window, Alignment, ContentFit, Element, Length, Subscription, Task, Theme};
use iced_aw::Wrap;
use rfd::FileDialog;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use photo_gallery::config::GalleryConfig;
use photo_gallery::media::{self, ImportSummary};
use photo_gallery::state::data::PhotoRecord;
use photo_gallery::state::store::Removal;
use photo_gallery::state::worker::StoreHandle;

/// Edge length of a grid tile in logical pixels
const TILE_SIZE: f32 = 150.0;

/// What the grid currently knows about the store
#[derive(Debug)]
enum Photos {
    Loading,
    Loaded(Vec<PhotoRecord>),
    /// Listing failed. Not the same as an empty gallery.
    Unavailable(String),
}

/// Main application state
struct PhotoGallery {
    store: StoreHandle,
    config: GalleryConfig,
    photos: Photos,
    /// Photo shown in the full view, if any
    selected: Option<PhotoRecord>,
    show_info: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    Refresh,
    PhotosLoaded(Result<Vec<PhotoRecord>, String>),
    /// User clicked "Take Photo"
    TakePhoto,
    PhotoTaken(Result<PhotoRecord, String>),
    /// User clicked "Import Folder"
    ImportFolder,
    ImportComplete(Result<ImportSummary, String>),
    Open(PhotoRecord),
    ToggleInfo,
    Close,
    Delete,
    Deleted(Result<Removal, String>),
    Share,
    Shared(Result<PathBuf, String>),
    CloseRequested(window::Id),
    StoreClosed(Result<(), String>),
}

impl PhotoGallery {
    fn new(store: StoreHandle, config: GalleryConfig) -> (Self, Task<Message>) {
        tracing::info!("🎨 Photo Gallery started, photos in {}", config.photo_dir().display());

        let gallery = PhotoGallery {
            store,
            config,
            photos: Photos::Loading,
            selected: None,
            show_info: false,
            status: "Ready.".to_string(),
        };
        let load = gallery.load_photos();
        (gallery, load)
    }

    fn load_photos(&self) -> Task<Message> {
        let store = self.store.clone();
        Task::perform(
            async move { store.list_all().await.map_err(|e| e.to_string()) },
            Message::PhotosLoaded,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Refresh => self.load_photos(),
            Message::PhotosLoaded(Ok(photos)) => {
                tracing::debug!("Loaded {} photos", photos.len());
                self.photos = Photos::Loaded(photos);
                Task::none()
            }
            Message::PhotosLoaded(Err(err)) => {
                tracing::error!("Error fetching photos: {}", err);
                self.photos = Photos::Unavailable(err);
                Task::none()
            }
            Message::TakePhoto => {
                let source = FileDialog::new()
                    .set_title("Take a Photo")
                    .add_filter("Images", &media::IMAGE_EXTENSIONS)
                    .pick_file();

                let Some(source) = source else {
                    return Task::none();
                };

                self.status = format!("Saving {}...", source.display());
                let store = self.store.clone();
                let photo_dir = self.config.photo_dir();

                // No positioning source on the desktop, so captures carry no location
                Task::perform(
                    async move {
                        media::record_capture(source, photo_dir, None, store)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::PhotoTaken,
                )
            }
            Message::PhotoTaken(Ok(record)) => {
                // Show the new photo straight away, with share and close at hand
                self.status = format!("✅ Photo saved (#{}).", record.id);
                self.selected = Some(record);
                self.show_info = false;
                self.load_photos()
            }
            Message::PhotoTaken(Err(err)) => {
                tracing::error!("Error saving photo: {}", err);
                self.status = format!("Could not save photo: {}", err);
                Task::none()
            }
            Message::ImportFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder();

                let Some(folder) = folder else {
                    return Task::none();
                };

                self.status = format!("Importing from {}...", folder.display());
                let store = self.store.clone();
                Task::perform(
                    async move {
                        media::import_folder(folder, store)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::ImportComplete,
                )
            }
            Message::ImportComplete(Ok(summary)) => {
                self.status = format!(
                    "✅ Import complete! Added {} photos, skipped {} already in the gallery, {} failed.",
                    summary.imported_count, summary.skipped_count, summary.failed_count
                );
                self.load_photos()
            }
            Message::ImportComplete(Err(err)) => {
                tracing::error!("Import failed: {}", err);
                self.status = format!("Import failed: {}", err);
                Task::none()
            }
            Message::Open(record) => {
                self.selected = Some(record);
                self.show_info = false;
                Task::none()
            }
            Message::ToggleInfo => {
                self.show_info = !self.show_info;
                Task::none()
            }
            Message::Close => {
                self.selected = None;
                Task::none()
            }
            Message::Delete => {
                let Some(record) = &self.selected else {
                    return Task::none();
                };

                let id = record.id;
                let store = self.store.clone();
                Task::perform(
                    async move { store.remove_photo(id).await.map_err(|e| e.to_string()) },
                    Message::Deleted,
                )
            }
            Message::Deleted(Ok(removal)) => {
                self.status = match removal {
                    Removal::Removed(record) => format!("🗑️  Deleted {}.", record.file_name()),
                    Removal::FileMissing(record) => {
                        format!("Deleted {}; its file was already gone.", record.file_name())
                    }
                    Removal::NoRecord => "Photo was already deleted.".to_string(),
                };
                self.selected = None;
                self.load_photos()
            }
            Message::Deleted(Err(err)) => {
                // The record is still there, so keep the full view open
                tracing::error!("Error deleting photo: {}", err);
                self.status = format!("Could not delete photo: {}", err);
                Task::none()
            }
            Message::Share => {
                let Some(record) = &self.selected else {
                    return Task::none();
                };

                let destination = FileDialog::new()
                    .set_title("Share Photo")
                    .set_file_name(record.file_name())
                    .save_file();

                let Some(destination) = destination else {
                    return Task::none();
                };

                Task::perform(
                    media::share(record.image_path.clone(), destination),
                    |result| Message::Shared(result.map_err(|e| e.to_string())),
                )
            }
            Message::Shared(Ok(path)) => {
                self.status = format!("Shared to {}.", path.display());
                Task::none()
            }
            Message::Shared(Err(err)) => {
                tracing::error!("Error sharing photo: {}", err);
                self.status = format!("Could not share photo: {}", err);
                Task::none()
            }
            Message::CloseRequested(_) => {
                let store = self.store.clone();
                Task::perform(
                    async move { store.shutdown().await.map_err(|e| e.to_string()) },
                    Message::StoreClosed,
                )
            }
            Message::StoreClosed(result) => {
                if let Err(err) = result {
                    tracing::error!("Photo store did not close cleanly: {}", err);
                }
                iced::exit()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let toolbar = row![
            button("Take Photo").on_press(Message::TakePhoto).padding(10),
            button("Import Folder").on_press(Message::ImportFolder).padding(10),
            button("Refresh").on_press(Message::Refresh).padding(10),
        ]
        .spacing(10);

        let body = match &self.selected {
            Some(record) => self.full_view(record),
            None => self.grid(),
        };

        let content = column![
            text(self.title_line()).size(32),
            toolbar,
            container(body)
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill),
            text(&self.status).size(16),
        ]
        .spacing(20)
        .padding(20)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn title_line(&self) -> String {
        match &self.photos {
            Photos::Loaded(photos) => format!("Photo Gallery · {} photos", photos.len()),
            _ => "Photo Gallery".to_string(),
        }
    }

    fn grid(&self) -> Element<Message> {
        match &self.photos {
            Photos::Loading => text("Loading photos...").into(),
            Photos::Unavailable(err) => text(format!("Gallery unavailable: {}", err)).into(),
            Photos::Loaded(photos) if photos.is_empty() => text("No images found").into(),
            Photos::Loaded(photos) => {
                let tiles: Vec<Element<Message>> = photos
                    .iter()
                    .map(|record| {
                        button(
                            picture(&record.image_path)
                                .width(Length::Fixed(TILE_SIZE))
                                .height(Length::Fixed(TILE_SIZE))
                                .content_fit(ContentFit::Cover),
                        )
                        .on_press(Message::Open(record.clone()))
                        .padding(0)
                        .into()
                    })
                    .collect();

                scrollable(Wrap::with_elements(tiles).spacing(10.0).line_spacing(10.0))
                    .height(Length::Fill)
                    .into()
            }
        }
    }

    fn full_view<'a>(&'a self, record: &'a PhotoRecord) -> Element<'a, Message> {
        let mut content = Column::new()
            .spacing(15)
            .align_x(Alignment::Center)
            .push(
                picture(&record.image_path)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .content_fit(ContentFit::Contain),
            );

        if self.show_info {
            let location = match record.coordinates() {
                Some(c) => format!("Location: {:.6}, {:.6}", c.latitude, c.longitude),
                None => "Location unavailable".to_string(),
            };
            content = content
                .push(text(format!("#{} · {}", record.id, record.image_path)).size(14))
                .push(text(location).size(14));
        }

        content
            .push(
                row![
                    button("Info").on_press(Message::ToggleInfo).padding(10),
                    button("Delete").on_press(Message::Delete).padding(10),
                    button("Share").on_press(Message::Share).padding(10),
                    button("Close").on_press(Message::Close).padding(10),
                ]
                .spacing(20),
            )
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        window::close_requests().map(Message::CloseRequested)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Image widget for a stored path. A missing file renders as an empty tile.
fn picture(path: &str) -> image::Image<image::Handle> {
    image(image::Handle::from_path(path))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photo_gallery=info")),
        )
        .init();

    let config = GalleryConfig::from_default_location()?;
    let store = StoreHandle::open(&config)?;

    iced::application("Photo Gallery", PhotoGallery::update, PhotoGallery::view)
        .subscription(PhotoGallery::subscription)
        .theme(PhotoGallery::theme)
        .exit_on_close_request(false)
        .centered()
        .run_with(move || PhotoGallery::new(store, config))?;

    Ok(())
}
