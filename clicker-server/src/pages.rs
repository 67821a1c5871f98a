use {
    leptos::prelude::*,
    axum::response::{Html, IntoResponse, Response},
    clicker_core::{UpgradeKind, format_rate},
    crate::database::{users::User, leaderboard::LeaderboardEntry},
};

pub struct UpgradeRow {
    pub kind: UpgradeKind,
    pub level: u32,
    pub next_cost: i64,
}

#[component]
fn layout(logged_in: bool, flashes: Vec<String>, children: Children) -> impl IntoView {
    view! {
        <header class="border-b border-stone-700 bg-stone-900 px-6 py-3">
            <nav class="flex items-center gap-6">
                <a href="/" class="text-lg font-bold tracking-wider text-amber-400">"blockclicker"</a>
                <a href="/leaderboard" class="text-stone-300 hover:text-amber-300">"Leaderboard"</a>
                <div class="ml-auto flex gap-4">
                    {if logged_in {
                        view! { <a href="/logout" class="text-stone-300 hover:text-amber-300">"Log out"</a> }.into_any()
                    } else {
                        view! {
                            <a href="/register" class="text-stone-300 hover:text-amber-300">"Register"</a>
                            <a href="/login" class="text-stone-300 hover:text-amber-300">"Log in"</a>
                        }.into_any()
                    }}
                </div>
            </nav>
        </header>
        {flashes.into_iter()
            .map(|message| view! { <div class="flash bg-amber-900/40 px-6 py-2 text-amber-200">{message}</div> })
            .collect_view()}
        <main class="mx-auto max-w-3xl p-6">{children()}</main>
    }
}

#[component]
fn upgrade_table(upgrades: Vec<UpgradeRow>) -> impl IntoView {
    view! {
        <table class="w-full text-sm">
            <thead>
                <tr class="border-b border-stone-700">
                    <th class="px-4 py-2 text-left">"Upgrade"</th>
                    <th class="px-4 py-2 text-left">"Level"</th>
                    <th class="px-4 py-2 text-left">"Cost"</th>
                    <th class="px-4 py-2"></th>
                </tr>
            </thead>
            <tbody>
                {upgrades.into_iter().map(|row| {
                    let name = row.kind.name();
                    view! {
                        <tr class="border-b border-stone-800">
                            <td class="px-4 py-2">{name}</td>
                            <td class="px-4 py-2"><span id=format!("level-{name}")>{row.level.to_string()}</span></td>
                            <td class="px-4 py-2"><span id=format!("cost-{name}")>{row.next_cost.to_string()}</span></td>
                            <td class="px-4 py-2 text-right">
                                <button type="button" class="upgrade rounded border border-amber-700 px-3 py-1" data-upgrade=name>"Buy"</button>
                            </td>
                        </tr>
                    }
                }).collect_view()}
            </tbody>
        </table>
    }
}

pub fn game_page(user: &User, upgrades: Vec<UpgradeRow>, flashes: Vec<String>) -> Response {
    let username = user.username.clone();
    let blocks = user.blocks.to_string();
    let bpc = user.bpc.to_string();
    let bps = format_rate(user.bps);

    render_page(view! {
        <Layout logged_in=true flashes=flashes>
            <p class="text-stone-400">"Mining as " {username}</p>
            <h1 class="my-4 text-4xl font-bold">"Blocks: " <span id="counter">{blocks}</span></h1>
            <button id="mine" type="button" class="rounded bg-amber-600 px-6 py-3 text-lg font-bold text-black hover:bg-amber-500">"Mine"</button>
            <p class="my-4">
                "Blocks per click: " <span id="bpc">{bpc}</span>
                " | Blocks per second: " <span id="bps">{bps}</span>
            </p>
            <p id="message" class="text-red-400"></p>
            <UpgradeTable upgrades=upgrades />
            <script type="module" src="/static/clicker.js"></script>
        </Layout>
    })
}

#[component]
fn error_message(message: Option<String>) -> impl IntoView {
    message.map(|message| view! { <p class="error my-2 text-red-400">{message}</p> })
}

pub fn login_page(message: Option<String>, flashes: Vec<String>) -> Response {
    render_page(view! {
        <Layout logged_in=false flashes=flashes>
            <h1 class="mb-4 text-2xl font-bold">"Log in"</h1>
            <ErrorMessage message=message />
            <form action="/login" method="post" class="flex flex-col gap-3">
                <input name="username" type="text" placeholder="Username" autocomplete="off" />
                <input name="password" type="password" placeholder="Password" />
                <button type="submit" class="rounded bg-amber-600 px-4 py-2 text-black">"Log in"</button>
            </form>
        </Layout>
    })
}

pub fn register_page(message: Option<String>, flashes: Vec<String>) -> Response {
    render_page(view! {
        <Layout logged_in=false flashes=flashes>
            <h1 class="mb-4 text-2xl font-bold">"Register"</h1>
            <ErrorMessage message=message />
            <form action="/register" method="post" class="flex flex-col gap-3">
                <input name="username" type="text" placeholder="Username" autocomplete="off" />
                <input name="password" type="password" placeholder="Password" />
                <input name="confirmation" type="password" placeholder="Confirm password" />
                <button type="submit" class="rounded bg-amber-600 px-4 py-2 text-black">"Register"</button>
            </form>
        </Layout>
    })
}

pub fn leaderboard_page(entries: Vec<LeaderboardEntry>, logged_in: bool, flashes: Vec<String>) -> Response {
    render_page(view! {
        <Layout logged_in=logged_in flashes=flashes>
            <h1 class="mb-4 text-2xl font-bold">"Leaderboard"</h1>
            <table class="w-full text-sm">
                <thead>
                    <tr class="border-b border-stone-700">
                        <th class="px-4 py-2 text-left">"#"</th>
                        <th class="px-4 py-2 text-left">"Player"</th>
                        <th class="px-4 py-2 text-left">"Blocks"</th>
                    </tr>
                </thead>
                <tbody>
                    {entries.into_iter().enumerate().map(|(index, entry)| view! {
                        <tr class="border-b border-stone-800">
                            <td class="px-4 py-2">{(index + 1).to_string()}</td>
                            <td class="px-4 py-2">{entry.username}</td>
                            <td class="px-4 py-2">{entry.blocks.to_string()}</td>
                        </tr>
                    }).collect_view()}
                </tbody>
            </table>
        </Layout>
    })
}

fn render_page(page_component: impl IntoView + 'static) -> Response {
    render_component(view! {
        <!doctype html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <title>"blockclicker"</title>
                <script src="https://cdn.tailwindcss.com"></script>
            </head>
            <body class="min-h-screen bg-stone-950 text-stone-200">{ page_component }</body>
        </html>
    })
}

fn render_component(component: impl IntoView + 'static) -> Response {
    Html(component.to_html()).into_response()
}
