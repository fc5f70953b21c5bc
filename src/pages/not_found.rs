use leptos::prelude::*;
use leptos_router::components::A;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"Nothing here"</h1>
			<p>"This page does not exist."</p>
			<A href="/">"Back to the explorer"</A>
		</div>
	}
}
