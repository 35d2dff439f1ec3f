use std::{
    cell::RefCell,
    rc::Rc,
    sync::mpsc::{self, Receiver, TryRecvError},
    time::Duration,
};

use eframe::egui::{self, Color32, RichText, TextEdit};
use pagekit::{
    fetch_with_retry, ClickTarget, FetchOptions, MultiSelect, MultiSelectEvent, SelectOption,
    Theme, ThemeSwitcher,
};

const CITY_OPTIONS: &str = r#"[
  { "name": "city", "value": "msk", "label": "Moscow" },
  { "name": "city", "value": "spb", "label": "Saint Petersburg" },
  { "name": "city", "value": "kzn", "label": "Kazan" },
  { "name": "city", "value": "nsk", "label": "Novosibirsk" },
  { "name": "city", "value": "ekb", "label": "Yekaterinburg" }
]"#;

struct PagekitGuiApp {
    theme: ThemeSwitcher,
    cities: MultiSelect,
    search: String,
    change_log: Rc<RefCell<Vec<String>>>,
    url: String,
    status: String,
    in_flight: bool,
    rx: Option<Receiver<Result<String, String>>>,
    last_error: Option<String>,
}

impl PagekitGuiApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut theme = ThemeSwitcher::new(Theme::Light);
        let ctx = cc.egui_ctx.clone();
        // Chart/visuals hook: restyle whenever the theme flips.
        theme.subscribe(move |theme| {
            ctx.set_visuals(match theme {
                Theme::Light => egui::Visuals::light(),
                Theme::Dark => egui::Visuals::dark(),
            });
        });

        let mut cities = MultiSelect::from_json(CITY_OPTIONS).unwrap_or_default();
        let change_log = Rc::new(RefCell::new(Vec::new()));
        let sink = change_log.clone();
        cities.subscribe(move |event| {
            if let MultiSelectEvent::Changed { values, summary } = event {
                sink.borrow_mut().push(format!("{summary} -> {values:?}"));
            }
        });

        Self {
            theme,
            cities,
            search: String::new(),
            change_log,
            url: "https://httpbin.org/status/401".to_owned(),
            status: "Ready".to_owned(),
            in_flight: false,
            rx: None,
            last_error: None,
        }
    }
}

impl eframe::App for PagekitGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_response();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("pagekit demo");
                let label = match self.theme.current() {
                    Theme::Light => "Dark mode",
                    Theme::Dark => "Light mode",
                };
                if ui.button(label).clicked() {
                    self.theme.toggle();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_multiselect_ui(ui);
            ui.separator();
            self.render_fetch_ui(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

impl PagekitGuiApp {
    fn render_multiselect_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Cities");

        let widget = ui.vertical(|ui| {
            if ui.button(self.cities.summary().to_string()).clicked() {
                self.cities.click(ClickTarget::Trigger);
                if self.cities.is_open() {
                    self.search.clear();
                }
            }

            if !self.cities.is_open() {
                return;
            }

            let search = ui.add(
                TextEdit::singleline(&mut self.search)
                    .hint_text("Search")
                    .desired_width(240.0),
            );
            if self.cities.take_focus_request() {
                search.request_focus();
            }
            if search.clicked() {
                self.cities.click(ClickTarget::SearchInput);
            }
            if search.changed() {
                self.cities.filter_options(&self.search);
            }

            if ui.button("Select all").clicked() {
                self.cities.click(ClickTarget::SelectAll);
            }

            let visible: Vec<(SelectOption, bool)> = self
                .cities
                .visible_options()
                .map(|(option, selected)| (option.clone(), selected))
                .collect();
            for (option, mut selected) in visible {
                if ui.checkbox(&mut selected, option.label.as_str()).clicked() {
                    self.cities.click(ClickTarget::Option(option.value));
                }
            }

            if ui.button("Clear").clicked() {
                self.cities.clear();
            }
        });

        let clicked_outside = ui.input(|input| {
            input.pointer.any_click()
                && input
                    .pointer
                    .interact_pos()
                    .is_some_and(|pos| !widget.response.rect.contains(pos))
        });
        if clicked_outside {
            self.cities.click(ClickTarget::Outside);
        }

        ui.label(format!("Selected values: {:?}", self.cities.values()));
        for line in self.change_log.borrow().iter().rev().take(5) {
            ui.label(RichText::new(line).monospace());
        }
    }

    fn render_fetch_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Fetch with retry");
        ui.horizontal(|ui| {
            ui.label("URL");
            ui.add(TextEdit::singleline(&mut self.url).desired_width(450.0));
            if ui
                .add_enabled(!self.in_flight, egui::Button::new("Fetch"))
                .clicked()
            {
                self.run_fetch_async();
            }
            if self.in_flight {
                ui.spinner();
            }
        });

        let status_color = if self.last_error.is_some() {
            Color32::from_rgb(215, 40, 40)
        } else {
            Color32::from_rgb(35, 120, 35)
        };
        ui.label(RichText::new(format!("Status: {}", self.status)).color(status_color));
    }

    fn run_fetch_async(&mut self) {
        let url = self.url.clone();

        self.status = "Fetching...".to_owned();
        self.in_flight = true;
        self.last_error = None;

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);

        std::thread::spawn(move || {
            let _ = tx.send(run_fetch_request(url));
        });
    }

    fn poll_response(&mut self) {
        let Some(rx) = &self.rx else {
            return;
        };

        match rx.try_recv() {
            Ok(message) => {
                self.in_flight = false;
                self.rx = None;
                match message {
                    Ok(status) => {
                        self.status = status;
                        self.last_error = None;
                    }
                    Err(err) => {
                        self.status = format!("Fetch failed: {err}");
                        self.last_error = Some(err);
                    }
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                self.rx = None;
                self.status = "Worker disconnected".to_owned();
            }
        }
    }
}

fn run_fetch_request(url: String) -> Result<String, String> {
    if url.trim().is_empty() {
        return Err("URL is empty".to_owned());
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime init failed: {err}"))?;
    runtime.block_on(async move {
        let response = fetch_with_retry(&url, &FetchOptions::new(), 3, 1_000)
            .await
            .map_err(|err| err.to_string())?;
        Ok(format!("OK {}", response.status()))
    })
}

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "pagekit GUI",
        options,
        Box::new(|cc| Box::new(PagekitGuiApp::new(cc))),
    )
}
